use taskbus::{StopTaskRequest, TaskBus};

#[cfg(feature = "rt-async-io")]
fn main() {
    if let Err(e) = smol::block_on(run()) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

#[cfg(feature = "rt-tokio")]
fn main() {
    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("init tokio runtime failed: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(run()) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let task = args.next().unwrap_or_else(|| "NightlyBackup".to_string());
    let host = args.next();

    let bus = TaskBus::builder().build()?;

    let mut req = StopTaskRequest::new(task).force();
    if let Some(host) = host {
        req = req.host(host);
    }

    if let Err(e) = bus.tasks().stop(req).await {
        eprintln!("id={} category={} target={}", e.id(), e.category(), e.target());
        return Err(e.into());
    }
    println!("stopped");
    Ok(())
}
