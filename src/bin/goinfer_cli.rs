//! goinfer-cli — Goinfer 服务端的命令行客户端
//!
//! Usage:
//!   goinfer-cli state                              Show models and the loaded model
//!   goinfer-cli load <model> [ctx]                 Load a model (default ctx 2048)
//!   goinfer-cli unload                             Unload the current model
//!   goinfer-cli infer [--stream] [--template <t>] <prompt>
//!   goinfer-cli tasks                              Print the task tree
//!   goinfer-cli task <path>                        Show one task
//!   goinfer-cli exec <task> <prompt>               Execute a task

use anyhow::{bail, Context};
use goinfer_client::{InferParams, InferenceClient, ModelConfig};
use std::io::Write;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let outcome = match args[1].as_str() {
        "version" | "--version" | "-V" => {
            println!("goinfer-cli {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        "help" | "--help" | "-h" => {
            print_usage();
            return;
        }
        cmd => run(cmd, &args[2..]).await,
    };

    if let Err(e) = outcome {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cmd: &str, args: &[String]) -> anyhow::Result<()> {
    let client = InferenceClient::builder()
        .on_token(|t| {
            print!("{}", t);
            let _ = std::io::stdout().flush();
        })
        .on_start_emit(|stats| eprintln!("[thinking took {}]", stats.thinking_time_format))
        .build()
        .context("failed to create client (set GOINFER_SERVER_URL and GOINFER_API_KEY)")?;

    match cmd {
        "state" => cmd_state(&client).await,
        "load" => cmd_load(&client, args).await,
        "unload" => {
            client.unload_model().await?;
            println!("model unloaded");
            Ok(())
        }
        "infer" => cmd_infer(&client, args).await,
        "tasks" => {
            let tree = client.load_tasks().await?;
            println!("{}", serde_json::to_string_pretty(&tree)?);
            Ok(())
        }
        "task" => {
            let path = args.first().context("usage: goinfer-cli task <path>")?;
            let task = client.load_task(path).await?;
            println!("name:     {}", task.name);
            println!("model:    {} (ctx {})", task.model_conf.name, task.model_conf.context_size);
            println!("template: {}", task.template);
            Ok(())
        }
        "exec" => {
            if args.len() < 2 {
                bail!("usage: goinfer-cli exec <task> <prompt>");
            }
            let output = client.execute_task(&args[0], &args[1..].join(" ")).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

async fn cmd_state(client: &InferenceClient) -> anyhow::Result<()> {
    let state = client.models_state().await?;
    let mut names: Vec<_> = state.models.keys().collect();
    names.sort();
    for name in names {
        let marker = if state.is_model_loaded && *name == state.loaded_model {
            "*"
        } else {
            " "
        };
        println!("{} {} (ctx {})", marker, name, state.models[name].context_size);
    }
    if !state.is_model_loaded {
        println!("no model loaded");
    }
    Ok(())
}

async fn cmd_load(client: &InferenceClient, args: &[String]) -> anyhow::Result<()> {
    let name = args.first().context("usage: goinfer-cli load <model> [ctx]")?;
    let ctx = match args.get(1) {
        Some(raw) => raw.parse::<u32>().context("ctx must be a positive integer")?,
        None => 2048,
    };
    client.load_model(&ModelConfig::new(name.as_str(), ctx)).await?;
    println!("loaded {} (ctx {})", name, ctx);
    Ok(())
}

async fn cmd_infer(client: &InferenceClient, args: &[String]) -> anyhow::Result<()> {
    let mut stream = false;
    let mut template: Option<String> = None;
    let mut prompt = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--stream" => stream = true,
            "--template" => {
                i += 1;
                template = Some(args.get(i).context("--template needs a value")?.clone());
            }
            word => prompt.push(word.to_string()),
        }
        i += 1;
    }
    if prompt.is_empty() {
        bail!("usage: goinfer-cli infer [--stream] [--template <t>] <prompt>");
    }

    let prompt = prompt.join(" ");
    let params = InferParams::new().stream(stream);
    let inference = client.infer(&prompt, template.as_deref(), Some(params));
    tokio::pin!(inference);

    // Keep the call alive while abort() runs; a dropped call leaves the session idle.
    let result = tokio::select! {
        r = &mut inference => r?,
        _ = tokio::signal::ctrl_c() => {
            client.abort().await?;
            match inference.await {
                Err(e) if e.is_cancelled() => bail!("aborted"),
                other => other?,
            }
        }
    };

    if stream {
        println!();
    } else {
        println!("{}", result.text);
    }
    eprintln!(
        "[{} tokens, {:.2} tokens/s, total {}]",
        result.total_tokens, result.tokens_per_second, result.total_time_format
    );
    Ok(())
}

fn print_usage() {
    println!(
        r#"goinfer-cli — Goinfer 命令行客户端

USAGE:
    goinfer-cli <COMMAND> [OPTIONS]

COMMANDS:
    state                               Show available models and the loaded one
    load <model> [ctx]                  Load a model
    unload                              Unload the current model
    infer [--stream] [--template <t>] <prompt>
                                        Run an inference (Ctrl-C aborts)
    tasks                               Print the task tree
    task <path>                         Show one task
    exec <task> <prompt>                Execute a task
    version                             Show version information
    help                                Show this help message

ENVIRONMENT:
    GOINFER_SERVER_URL                  Server URL (default http://localhost:5143)
    GOINFER_API_KEY                     API key (required)
    GOINFER_HTTP_TIMEOUT_SECS           Buffered request timeout (default 300)
    RUST_LOG                            Log filter (default warn)
"#
    );
}
