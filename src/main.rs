use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use vibe_coach::artifact::CodeArtifact;
use vibe_coach::pipeline::{self, StageObserver};
use vibe_coach::wire::Category;
use vibe_coach::{cli, config, log, ux};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = cli::Args::parse();
    log::init_tracing(args.debug);

    let mut cfg = config::Config::load(args.config.as_deref().map(Path::new))?;
    args.apply_to(&mut cfg);

    let request = args.request();
    let missing = cli::missing_required(&request);
    if !missing.is_empty() && !args.allow_missing {
        ux::print_missing_fields(request.category().tag(), &missing);
        return Ok(ExitCode::from(2));
    }

    let observer: Arc<dyn StageObserver> = if args.no_progress || args.json {
        Arc::new(())
    } else {
        Arc::new(ux::SpinnerObserver::new())
    };

    let language = request.field("programming_language").to_string();
    let is_code_request = request.category() == &Category::CodeGeneration;
    let run = pipeline::advise_with_config(&cfg, request, observer).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        ux::print_result(&run.result, run.log.as_ref());
    }

    if args.save_code || (is_code_request && !args.json) {
        match CodeArtifact::from_implementation(&run.result.implementation, &language) {
            Some(art) if args.save_code => {
                let path = art.save(Path::new(&cfg.out_dir))?;
                if !args.json {
                    ux::print_saved_artifact(&path);
                }
            }
            Some(art) => ux::print_code_hint(&art),
            None if !args.json => ux::print_no_artifact(),
            None => {}
        }
    }

    Ok(if run.log.is_some() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
