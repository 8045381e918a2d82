//! Check command handler

use anyhow::Result;

use capstan::application::select_hosts;
use capstan::presentation::output::check_json;

use super::{CommandContext, Status};

/// The configuration was validated while loading; this also validates the
/// target filters and prints what a deploy would act on.
pub fn run(ctx: &CommandContext) -> Result<Status> {
    select_hosts(&ctx.config.registry, &ctx.targets)?;

    if ctx.json {
        println!("{}", check_json(&ctx.config));
    } else {
        print!("{}", ctx.renderer().render_check(&ctx.config));
    }
    Ok(Status::Success)
}
