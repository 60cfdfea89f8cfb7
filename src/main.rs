use std::io;
use std::sync::Arc;

use agent_chat::cli::Args;
use agent_chat::logging::init_tracing;
use agent_chat::provider::new_cancel_signal;
use agent_chat::providers;
use agent_chat::repl::ChatSession;
use agent_chat::runner::TurnRunner;
use clap::Parser;
use tokio::io::BufReader;

fn main() -> io::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(args));
    // A pending stdin read would otherwise keep shutdown waiting for a newline.
    runtime.shutdown_background();
    result
}

async fn run(args: Args) -> io::Result<()> {
    let backend_id = args
        .backend_id()
        .unwrap_or_else(providers::backend_id_from_env);
    let options = args.backend_options();
    let backend = providers::backend_for_id(&backend_id, &options).map_err(io::Error::other)?;
    let profile = backend.profile();
    tracing::info!(backend = %profile.backend_id, agent_id = %profile.agent_id, "backend ready");

    let agent_name = match backend.agent_profile(new_cancel_signal()).await {
        Ok(agent) => agent.name,
        Err(error) => {
            tracing::warn!(%error, "agent lookup failed; using the agent id as its name");
            profile.agent_id.clone()
        }
    };

    let runner = TurnRunner::new(backend);
    let interrupts = tokio::spawn(watch_interrupts(Arc::clone(&runner)));

    let mut session = ChatSession::new(agent_name, runner);
    let mut stdout = io::stdout();
    let stdin = BufReader::new(tokio::io::stdin());

    tokio::select! {
        result = session.run(stdin, &mut stdout) => result,
        _ = interrupts => Ok(()),
    }
}

/// Ctrl-C cancels the active run; when idle it ends the session.
async fn watch_interrupts(runner: Arc<TurnRunner>) {
    loop {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(%error, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        if !runner.cancel_active() {
            return;
        }
        tracing::info!("cancelling active run");
    }
}
