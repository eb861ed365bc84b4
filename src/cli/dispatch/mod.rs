use crate::cli::actions::Action;
use crate::config::Config;
use anyhow::Result;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        config: Config::from_matches(matches)?,
    })
}
