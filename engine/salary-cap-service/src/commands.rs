//! Command line surface over the transfer engine

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use transfer_service::{
    AutoDraftRequest, PlayerId, RosterCompleteness, TeamId, TransferRequest, TransferService,
};

#[derive(Parser)]
#[command(name = "salary-cap")]
#[command(about = "Salary-cap roster transfers, budgets and auto-draft")]
pub struct Cli {
    /// Optional TOML file with logging and engine overrides
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Register a team with the full budget
    CreateTeam {
        team: TeamId,
        #[arg(long)]
        season: Option<i32>,
    },
    /// Show a team's budget and transfer allowance
    Ledger { team: TeamId },
    /// Show what a transfer would do without applying it
    Preview {
        #[command(flatten)]
        transfer: TransferArgs,
    },
    /// Apply a transfer
    Execute {
        #[command(flatten)]
        transfer: TransferArgs,
    },
    /// Check a candidate roster against the season's rules
    Validate {
        #[arg(value_delimiter = ',', required = true)]
        players: Vec<PlayerId>,
        #[arg(long)]
        season: Option<i32>,
        /// Report progress instead of requiring a complete roster
        #[arg(long)]
        partial: bool,
    },
    /// Propose players that complete a team's roster
    AutoDraft {
        team: TeamId,
        week: u32,
        #[arg(long)]
        season: Option<i32>,
        /// Players staged to leave
        #[arg(long = "out", value_delimiter = ',')]
        players_out: Vec<PlayerId>,
        /// Players staged to join
        #[arg(long = "in", value_delimiter = ',')]
        players_in: Vec<PlayerId>,
        /// Fix the random choices
        #[arg(long)]
        seed: Option<u64>,
    },
    /// List transfers, newest first
    History {
        #[arg(long)]
        team: Option<TeamId>,
        #[arg(long)]
        week: Option<u32>,
        #[arg(long)]
        season: Option<i32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Close the current period and open a new week
    AdvanceWeek {
        #[arg(long)]
        to: u32,
        #[arg(long)]
        season: Option<i32>,
    },
    /// Market value of a team's roster
    Value {
        team: TeamId,
        week: u32,
        #[arg(long)]
        season: Option<i32>,
    },
}

#[derive(clap::Args, Debug, PartialEq, Eq)]
pub struct TransferArgs {
    pub team: TeamId,
    pub week: u32,
    #[arg(long)]
    pub season: Option<i32>,
    #[arg(long = "out", value_delimiter = ',')]
    pub players_out: Vec<PlayerId>,
    #[arg(long = "in", value_delimiter = ',')]
    pub players_in: Vec<PlayerId>,
}

impl TransferArgs {
    fn request(&self, default_season: i32) -> TransferRequest {
        TransferRequest::new(
            self.team,
            self.week,
            self.season.unwrap_or(default_season),
            self.players_out.clone(),
            self.players_in.clone(),
        )
    }
}

/// Run one command and print its result as JSON on stdout
pub async fn run(service: &TransferService, command: Commands) -> Result<()> {
    let default_season = service.config().constraints.season;
    let season = |s: Option<i32>| s.unwrap_or(default_season);

    match command {
        Commands::CreateTeam { team, season: s } => {
            print_json(&service.create_team(team, season(s)).await?)
        }
        Commands::Ledger { team } => print_json(&service.ledger(team).await?),
        Commands::Preview { transfer } => {
            print_json(&service.preview_transfer(&transfer.request(default_season)).await?)
        }
        Commands::Execute { transfer } => {
            print_json(&service.execute_transfer(&transfer.request(default_season)).await?)
        }
        Commands::Validate { players, season: s, partial } => {
            let completeness =
                if partial { RosterCompleteness::Partial } else { RosterCompleteness::Final };
            print_json(&service.validate_roster(&players, season(s), completeness).await?)
        }
        Commands::AutoDraft { team, week, season: s, players_out, players_in, seed } => {
            let request = AutoDraftRequest {
                team_id: team,
                week,
                season: season(s),
                staged_out: players_out,
                staged_in: players_in,
                seed,
            };
            print_json(&service.auto_complete_roster(&request).await?.ensure_selected()?)
        }
        Commands::History { team, week, season: s, limit } => {
            let records = match team {
                Some(team_id) => {
                    service.team_transfer_history(team_id, season(s), week, limit).await?
                }
                None => service.transfer_history(season(s), week, limit).await?,
            };
            print_json(&records)
        }
        Commands::AdvanceWeek { to, season: s } => {
            print_json(&service.advance_week(to, season(s)).await?)
        }
        Commands::Value { team, week, season: s } => {
            print_json(&service.roster_value(team, week, season(s)).await?)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_execute_with_player_lists() {
        let cli = Cli::try_parse_from([
            "salary-cap", "execute", "7", "3", "--out", "1,2", "--in", "100,101",
        ])
        .unwrap();

        let Commands::Execute { transfer } = cli.command else {
            panic!("expected execute");
        };
        assert_eq!(transfer.players_out, vec![1, 2]);
        assert_eq!(transfer.players_in, vec![100, 101]);

        let request = transfer.request(2024);
        assert_eq!(request.team_id, 7);
        assert_eq!(request.week, 3);
        assert_eq!(request.season, 2024);
    }

    #[test]
    fn test_parse_advance_week() {
        let cli = Cli::try_parse_from([
            "salary-cap", "--config", "svc.toml", "advance-week", "--to", "1", "--season", "2025",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("svc.toml")));
        assert_eq!(cli.command, Commands::AdvanceWeek { to: 1, season: Some(2025) });
    }

    #[test]
    fn test_parse_validate_partial() {
        let cli = Cli::try_parse_from(["salary-cap", "validate", "1,2,3", "--partial"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Validate { players: vec![1, 2, 3], season: None, partial: true }
        );
    }

    #[test]
    fn test_advance_week_takes_no_from_period() {
        assert!(Cli::try_parse_from([
            "salary-cap", "advance-week", "--from", "Preseason", "--to", "2"
        ])
        .is_err());
    }

    #[test]
    fn test_parse_team_history_for_one_week() {
        let cli = Cli::try_parse_from([
            "salary-cap", "history", "--team", "4", "--week", "6", "--limit", "10",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Commands::History { team: Some(4), week: Some(6), season: None, limit: Some(10) }
        );
    }
}
