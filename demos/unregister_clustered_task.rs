use taskbus::{ClusterTarget, Credential, TaskBus, UnregisterClusteredTaskRequest};

fn main() {
    if let Err(e) = smol::block_on(run()) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cluster = std::env::var("TASKBUS_CLUSTER").unwrap_or_else(|_| "CL01".to_string());
    let mut target = ClusterTarget::new(cluster);
    if let (Ok(user), Ok(secret)) = (
        std::env::var("TASKBUS_USER"),
        std::env::var("TASKBUS_SECRET"),
    ) {
        target = target.with_credential(Credential::new(user, secret));
    }

    let bus = TaskBus::builder().build()?;
    bus.clustered()
        .unregister(UnregisterClusteredTaskRequest::new("ClusterSync", target))
        .await?;
    println!("unregistered");
    Ok(())
}
