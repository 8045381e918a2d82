//! Setup command handler

use anyhow::Result;

use capstan::presentation::factory::create_maintenance_use_case;

use super::{CommandContext, Status};

pub fn run(ctx: &CommandContext) -> Result<Status> {
    let use_case = create_maintenance_use_case(&ctx.config, ctx.cancel.clone());
    let report = use_case.setup_with_events(&ctx.targets, ctx.sink())?;
    Ok(ctx.finish(&report))
}
