use crate::shutdown::ExitCode;
use engine_runtime::executor::ImportOutcome;
use model::execution::report::RunStatus;

/// Prints the end-of-run summary and picks the process exit code.
pub fn print_outcome(outcome: &ImportOutcome) -> ExitCode {
    match &outcome.status {
        RunStatus::Success => {
            println!(
                "  {} rows imported in {} batches",
                outcome.metrics.records_inserted, outcome.metrics.batches_dispatched
            );
            println!("Done ({} seconds)", outcome.elapsed.as_secs());
            ExitCode::Success
        }
        RunStatus::Interrupted => {
            eprintln!("Interrupted");
            ExitCode::ShutdownRequested
        }
        RunStatus::Failed(reports) => {
            for report in reports {
                eprintln!("{report}");
            }
            ExitCode::GeneralError
        }
    }
}
