mod cli;

use crate::cli::configure_cli;
use env_logger::Env;
use hostconverge::docker::DockerRuntime;
use hostconverge::{MachineConfiguration, SystemResolver, run_convergence_pass};
use log::{error, info};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::time::sleep;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + 'static>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    #[cfg(target_os = "linux")]
    set_group_id();

    let config = configure_cli();
    let machine = MachineConfiguration::load(&config.config_path)?;
    let docker = DockerRuntime::connect()?;
    let resolver = SystemResolver;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
        info!("Received shutdown signal, finishing current pass...");
    })?;

    loop {
        let started = Instant::now();
        let result = run_convergence_pass(&docker, &resolver, &machine, &config.options).await;
        match result {
            Ok(report) => print!("{report}"),
            Err(e) if config.interval.is_none() => {
                error!("convergence pass failed: {e}");
                process::exit(1);
            }
            Err(e) => error!("convergence pass failed: {e}"),
        }

        let Some(interval) = config.interval else {
            break;
        };
        while running.load(Ordering::SeqCst) && started.elapsed() < Duration::from_secs(interval)
        {
            sleep(Duration::from_millis(500)).await;
        }
        if !running.load(Ordering::SeqCst) {
            break;
        }
    }
    Ok(())
}

/// Join the group owning the docker socket.
#[cfg(target_os = "linux")]
fn set_group_id() {
    let docker_gid = match std::env::var("DOCKER_GID") {
        Ok(gid) => gid.parse::<u32>(),
        Err(_) => Ok(999),
    };
    let Ok(docker_gid) = docker_gid else {
        error!("Invalid DOCKER_GID");
        return;
    };
    info!("Setting GID to {docker_gid}");
    // requires CAP_SETGID
    unsafe {
        if libc::setgid(docker_gid) != 0 {
            error!("Failed to set GID to {docker_gid}");
        }
    }
}
