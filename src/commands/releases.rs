//! Releases command handler

use anyhow::Result;

use capstan::presentation::factory::create_maintenance_use_case;
use capstan::presentation::output::releases_json;

use super::{CommandContext, Status};

/// List releases per host. Unreachable hosts are reported inline and make
/// the command exit non-zero.
pub fn run(ctx: &CommandContext) -> Result<Status> {
    let use_case = create_maintenance_use_case(&ctx.config, ctx.cancel.clone());
    let listing = use_case.releases(&ctx.targets)?;

    if ctx.json {
        println!("{}", releases_json(&listing));
    } else {
        print!("{}", ctx.renderer().render_releases(&listing));
    }

    if listing.iter().all(|entry| entry.releases.is_ok()) {
        Ok(Status::Success)
    } else {
        Ok(Status::HostsFailed)
    }
}
