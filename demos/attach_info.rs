// Attach to a forwarded JDWP port and print VM and thread information.
//
// Forward the target first:
//   adb forward tcp:8700 jdwp:<PID>
//   cargo run --example attach_info -- 127.0.0.1 8700

use anyhow::Result;
use jdwp_android::JdwpConnection;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("jdwp_android=debug")
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = args.next().unwrap_or_else(|| "8700".to_string()).parse()?;

    println!("Connecting to JDWP at {host}:{port}...");
    let connection = JdwpConnection::connect(&host, port).await?;
    println!("✓ Handshake complete");

    let version = connection.version().await?;
    println!("✓ VM: {} (JDWP {}.{})", version.vm_name, version.jdwp_major, version.jdwp_minor);

    let sizes = connection.ensure_android_profile().await?;
    println!("✓ 8-byte ID profile confirmed ({sizes:?})");

    let threads = connection.all_threads().await?;
    println!("✓ {} threads:", threads.len());
    for thread_id in threads {
        let name = connection.thread_name(thread_id).await?;
        println!("   {thread_id:#x}  {name}");
    }

    Ok(())
}
