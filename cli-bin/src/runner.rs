// src/runner.rs
//
// Child-process lifecycle for the `-- CMD` mode: every filesystem event
// restarts the command. A running child gets SIGINT, a grace period to exit,
// then SIGKILL.

use anyhow::{Context, Result};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info};

pub struct Runner {
    terms: Vec<String>,
    kill_delay: Duration,
    child: Option<Child>,
}

impl Runner {
    pub fn new(terms: Vec<String>, kill_delay: Duration) -> Self {
        Self {
            terms,
            kill_delay,
            child: None,
        }
    }

    /// Stop the current child, if any, and spawn a fresh one.
    pub fn restart(&mut self) -> Result<()> {
        self.shutdown()?;

        let (program, args) = self
            .terms
            .split_first()
            .context("empty command")?;

        let mut child = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning `{}`", program))?;

        if let Some(stdout) = child.stdout.take() {
            stream_output(stdout, false);
        }
        if let Some(stderr) = child.stderr.take() {
            stream_output(stderr, true);
        }

        info!("CMD: started `{}`", self.terms.join(" "));
        self.child = Some(child);

        Ok(())
    }

    /// SIGINT the child, wait out the grace period, then SIGKILL.
    pub fn shutdown(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        if child.try_wait().context("polling command")?.is_some() {
            return Ok(());
        }

        let _ = kill(Pid::from_raw(child.id() as i32), Signal::SIGINT);

        let deadline = Instant::now() + self.kill_delay;
        while Instant::now() < deadline {
            if child.try_wait().context("polling command")?.is_some() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(10));
        }

        let _ = child.kill();
        child.wait().context("reaping command")?;

        Ok(())
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            error!("stopping command: {:#}", err);
        }
    }
}

/// Forward one of the child's output streams to the logger, line by line.
fn stream_output<R: Read + Send + 'static>(stream: R, is_err: bool) {
    let _ = thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            match line {
                Ok(line) if is_err => error!("CMD: {}", line),
                Ok(line) => info!("CMD: {}", line),
                Err(_) => break,
            }
        }
    });
}
