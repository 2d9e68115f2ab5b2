// Break on Activity.onResume, then run a shell command inside the process.
//
//   adb forward tcp:8700 jdwp:<PID>
//   cargo run --example break_and_exec -- <PID> com.example.app
//
// Bring the app to the foreground to trigger the breakpoint.

use anyhow::Result;
use jdwp_android::session::DebugSession;
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("jdwp_android=debug")
        .init();

    let mut args = std::env::args().skip(1);
    let pid: u32 = args.next().unwrap_or_else(|| "0".to_string()).parse()?;
    let package = args.next().unwrap_or_else(|| "com.example.app".to_string());

    let stream = TcpStream::connect(("127.0.0.1", 8700)).await?;
    let session = DebugSession::attach(stream, pid, &package).await?;
    println!("✓ Attached to {package} (pid {pid})");

    println!("Waiting for Activity.onResume...");
    let hit = session
        .set_breakpoint_and_wait("Landroid/app/Activity;", "onResume")
        .await?;
    println!("✓ Breakpoint hit on thread {:#x}", hit.thread_id);

    let exit_code = session.exec(Some(hit.thread_id), "id").await?;
    println!("✓ `id` exited with code {exit_code}");

    session.clear_breakpoint(hit.request_id).await?;
    session.resume().await?;
    session.stop().await?;
    println!("✓ Detached");

    Ok(())
}
