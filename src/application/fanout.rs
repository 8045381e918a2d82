//! Run one closure per host, each on its own thread

use std::thread;

use crate::application::deploy::{DeployReport, HostOutcome};
use crate::domain::entities::Configuration;
use crate::domain::ports::{Connector, DeployEvent, DeployEventSink, Remote};
use crate::domain::value_objects::Host;
use crate::error::DeployError;

/// Call `work` for every host concurrently. Results come back in the
/// order of `hosts`, whatever order the threads finish in.
pub fn for_each_host<T, F>(hosts: &[Host], work: F) -> Vec<T>
where
    T: Send,
    F: Fn(&Host) -> T + Sync,
{
    if hosts.len() == 1 {
        return vec![work(&hosts[0])];
    }

    let work = &work;
    thread::scope(|scope| {
        let handles: Vec<_> = hosts
            .iter()
            .map(|host| scope.spawn(move || work(host)))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

/// Fan `work` out over `hosts` with the usual run/host events around
/// it. `work` fills in the host's outcome; its error becomes the host's
/// failure.
pub fn run_on_hosts<F>(
    command: &str,
    config: &Configuration,
    hosts: &[Host],
    connector: &dyn Connector,
    sink: &dyn DeployEventSink,
    work: F,
) -> DeployReport
where
    F: Fn(&dyn Remote, &mut HostOutcome) -> Result<(), DeployError> + Sync,
{
    sink.on_event(DeployEvent::RunStarted {
        command: command.to_string(),
        application: config.application.clone(),
        branch: config.branch.clone(),
        hosts: hosts.iter().map(|h| h.address().to_string()).collect(),
    });

    let outcomes = for_each_host(hosts, |host| {
        sink.on_event(DeployEvent::HostStarted {
            host: host.address().to_string(),
        });
        let remote = connector.connect(host);
        let mut outcome = HostOutcome::new(host.clone());
        if let Err(err) = work(remote.as_ref(), &mut outcome) {
            tracing::error!(host = %host, command, error = %err, "failed");
            outcome.error = Some(err);
        }
        sink.on_event(DeployEvent::HostFinished {
            host: host.address().to_string(),
            success: outcome.is_success(),
            error: outcome.error.as_ref().map(ToString::to_string),
        });
        outcome
    });

    let report = DeployReport::new(outcomes);
    sink.on_event(DeployEvent::Completed {
        succeeded: report.succeeded(),
        failed: report.failed(),
    });
    report
}
