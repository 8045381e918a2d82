//! Deploy command handler

use anyhow::Result;

use capstan::application::DeployOptions;
use capstan::presentation::factory::create_deploy_use_case;
use capstan::presentation::output::plan_json;

use super::{CommandContext, Status};

/// Run the full pipeline on every selected host
pub fn run(ctx: &CommandContext) -> Result<Status> {
    let use_case = create_deploy_use_case(&ctx.config, &ctx.config_path, ctx.cancel.clone());
    let options = DeployOptions::new().with_targets(ctx.targets.clone());

    let report = use_case.execute_with_events(&options, ctx.sink())?;
    Ok(ctx.finish(&report))
}

/// `--dry-run`: print the execution plan per host, touch nothing
pub fn plan(ctx: &CommandContext) -> Result<Status> {
    let use_case = create_deploy_use_case(&ctx.config, &ctx.config_path, ctx.cancel.clone());
    let options = DeployOptions::new().with_targets(ctx.targets.clone());

    let plans = use_case.plan(&options)?;
    if ctx.json {
        println!("{}", plan_json(&plans));
    } else {
        print!("{}", ctx.renderer().render_plan(&plans));
    }
    Ok(Status::Success)
}
