//! Rollback command handler

use anyhow::Result;
use dialoguer::Confirm;
use is_terminal::IsTerminal;

use capstan::application::select_hosts;
use capstan::presentation::factory::create_rollback_use_case;

use super::{CommandContext, Status};

pub fn run(ctx: &CommandContext) -> Result<Status> {
    let hosts = select_hosts(&ctx.config.registry, &ctx.targets)?;

    let interactive = !ctx.yes && !ctx.json && std::io::stdin().is_terminal();
    if interactive {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Roll back {} on {} host{}?",
                ctx.config.application,
                hosts.len(),
                if hosts.len() == 1 { "" } else { "s" }
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("Aborted.");
            return Ok(Status::Success);
        }
    }

    let use_case = create_rollback_use_case(&ctx.config, ctx.cancel.clone());
    let report = use_case.execute_with_events(&ctx.targets, ctx.sink())?;
    Ok(ctx.finish(&report))
}
