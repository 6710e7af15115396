use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gmail-notifier",
    author,
    version,
    about,
    propagate_version = true,
    infer_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one poll cycle for the mailbox named by the trigger
    ///
    /// The trigger is taken from --email, --event, --event-file, or, when
    /// none is given, read as JSON from stdin.
    Run(TriggerArgs),

    /// Run a cycle every INTERVAL seconds until interrupted
    ///
    /// Cycles never overlap: the next one starts INTERVAL seconds after the
    /// previous one finished.
    Watch {
        #[command(flatten)]
        trigger: TriggerArgs,

        #[arg(long, short, value_name = "SECS", default_value_t = 60)]
        interval: u64,
    },

    /// Store the search query used for a mailbox
    SetQuery { email: String, query: String },

    /// Show the stored state for a mailbox
    Show { email: String },

    /// Forget the watermark, so the next cycle notifies every current match
    ResetWatermark { email: String },

    /// Print the Google consent URL for registering a mailbox
    AuthUrl {
        email: String,

        /// Also open the URL in the default browser
        #[arg(long)]
        open: bool,
    },

    /// Exchange an authorization code and store the resulting credential
    Authorize { email: String, code: String },
}

#[derive(Args, Debug)]
pub struct TriggerArgs {
    /// Mailbox address, instead of a trigger event
    #[arg(long, conflicts_with_all = ["event", "event_file"])]
    pub email: Option<String>,

    /// Trigger event JSON, e.g. '{"attributes":{"emailAddress":"me@example.com"}}'
    #[arg(long, conflicts_with = "event_file")]
    pub event: Option<String>,

    /// File containing the trigger event JSON
    #[arg(long, value_name = "PATH")]
    pub event_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_email() {
        let cli = Cli::try_parse_from(["gmail-notifier", "run", "--email", "me@example.com"]).unwrap();
        match cli.command {
            Command::Run(args) => assert_eq!(args.email.as_deref(), Some("me@example.com")),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_trigger_sources_conflict() {
        let result = Cli::try_parse_from([
            "gmail-notifier",
            "run",
            "--email",
            "me@example.com",
            "--event",
            "{}",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_watch_interval() {
        let cli = Cli::try_parse_from(["gmail-notifier", "watch", "--email", "a@b.c", "-i", "300"]).unwrap();
        match cli.command {
            Command::Watch { interval, .. } => assert_eq!(interval, 300),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
