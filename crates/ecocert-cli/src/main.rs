#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

//! ecocert CLI - command-line front end for the certification engine
//!
//! Commands:
//! - ecocert register <name> ... - Register an accommodation
//! - ecocert update-standards <id> ... - Replace environmental metrics
//! - ecocert audit <id> ... - Record an audit
//! - ecocert issue/renew <id> <audit-id> - Issue or renew a certification
//! - ecocert authorize-auditor <principal> <specialization>
//! - ecocert suspend/reinstate/revoke <id> - Registry owner controls
//! - ecocert show <record> - Print a record as JSON
//! - ecocert verify-chain - Verify the audit hash chain

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ecocert::{
    AuditScores, CallContext, CertificationEngine, EngineConfig, Metrics, NewAccommodation,
    NewAudit, Principal, SqliteStore,
};

#[derive(Parser)]
#[command(name = "ecocert")]
#[command(about = "Lodging sustainability certification engine", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Engine configuration file (TOML)
    #[arg(short, long, env = "ECOCERT_CONFIG")]
    config: PathBuf,

    /// SQLite database path; overrides `[storage] path` from the config
    #[arg(long, env = "ECOCERT_DB")]
    db: Option<PathBuf>,

    /// Calling principal
    #[arg(long = "as", env = "ECOCERT_PRINCIPAL", default_value = "anonymous")]
    caller: String,

    /// Current height
    #[arg(long, default_value_t = 0)]
    height: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register an accommodation owned by the caller
    Register {
        name: String,
        #[arg(short, long, default_value = "")]
        location: String,
        #[arg(short = 't', long, default_value = "")]
        category: String,
        #[arg(short = 'n', long)]
        capacity: u32,
    },

    /// Replace all six environmental metrics
    UpdateStandards {
        accommodation_id: u64,
        #[arg(long)]
        energy: u32,
        #[arg(long)]
        water: u32,
        #[arg(long)]
        waste: u32,
        #[arg(long)]
        renewable: u32,
        /// Carbon footprint rating, 0 (best) to 10 (worst)
        #[arg(long)]
        carbon: u32,
        #[arg(long)]
        local_sourcing: u32,
    },

    /// Record an audit (authorized auditors only)
    Audit {
        accommodation_id: u64,
        #[arg(long, default_value = "standard")]
        audit_type: String,
        #[arg(long)]
        energy: u32,
        #[arg(long)]
        water: u32,
        #[arg(long)]
        waste: u32,
        #[arg(long, default_value_t = 0)]
        issues: u32,
        #[arg(long, default_value = "")]
        recommendations: String,
    },

    /// Issue a certification from a passing audit
    Issue { accommodation_id: u64, audit_id: u64 },

    /// Renew a certification from a new passing audit
    Renew { accommodation_id: u64, audit_id: u64 },

    /// Authorize an auditor (registry owner only)
    AuthorizeAuditor {
        principal: String,
        specialization: String,
    },

    /// Deactivate an accommodation (registry owner only)
    Suspend { accommodation_id: u64 },

    /// Reactivate an accommodation (registry owner only)
    Reinstate { accommodation_id: u64 },

    /// Mark a certification invalid (registry owner only)
    Revoke { accommodation_id: u64 },

    /// Print a record
    Show {
        #[command(subcommand)]
        record: ShowCommands,
    },

    /// Verify the audit hash chain
    VerifyChain,
}

#[derive(Subcommand)]
enum ShowCommands {
    Accommodation { id: u64 },
    Standards { id: u64 },
    Certification { id: u64 },
    Audit { id: u64 },
    Audits { accommodation_id: u64 },
    Auditor { principal: String },
    /// Validity, level and status at the current height
    Status { id: u64 },
    /// Next accommodation and audit IDs
    Counters,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let mut config = EngineConfig::load(&cli.config)?;
    if let Some(db) = cli.db.clone() {
        config.storage.path = Some(db);
    }
    let engine = CertificationEngine::open(&config)?;

    let ctx = CallContext::new(Principal::new(cli.caller.clone())?, cli.height);
    run(&engine, &ctx, cli.command)
}

fn run(
    engine: &CertificationEngine<SqliteStore>,
    ctx: &CallContext,
    command: Commands,
) -> anyhow::Result<()> {
    match command {
        Commands::Register {
            name,
            location,
            category,
            capacity,
        } => {
            let id = engine.register(
                ctx,
                NewAccommodation {
                    name,
                    location,
                    category,
                    capacity,
                },
            )?;
            print_json(&serde_json::json!({ "accommodationId": id }))
        }

        Commands::UpdateStandards {
            accommodation_id,
            energy,
            water,
            waste,
            renewable,
            carbon,
            local_sourcing,
        } => {
            let score = engine.update_standards(
                ctx,
                accommodation_id,
                Metrics {
                    energy_efficiency: energy,
                    water_conservation: water,
                    waste_management: waste,
                    renewable_energy: renewable,
                    carbon_footprint: carbon,
                    local_sourcing,
                },
            )?;
            print_json(&serde_json::json!({ "overallSustainabilityScore": score }))
        }

        Commands::Audit {
            accommodation_id,
            audit_type,
            energy,
            water,
            waste,
            issues,
            recommendations,
        } => {
            let outcome = engine.conduct_audit(
                ctx,
                accommodation_id,
                NewAudit {
                    audit_type,
                    scores: AuditScores {
                        energy,
                        water,
                        waste,
                    },
                    compliance_issues: issues,
                    recommendations,
                },
            )?;
            print_json(&outcome)
        }

        Commands::Issue {
            accommodation_id,
            audit_id,
        } => print_json(&engine.issue_certification(ctx, accommodation_id, audit_id)?),

        Commands::Renew {
            accommodation_id,
            audit_id,
        } => print_json(&engine.renew_certification(ctx, accommodation_id, audit_id)?),

        Commands::AuthorizeAuditor {
            principal,
            specialization,
        } => {
            let auditor = Principal::new(principal)?;
            engine.authorize_auditor(ctx, &auditor, specialization)?;
            print_json(&engine.get_auditor_info(&auditor))
        }

        Commands::Suspend { accommodation_id } => {
            print_json(&engine.set_accommodation_active(ctx, accommodation_id, false)?)
        }

        Commands::Reinstate { accommodation_id } => {
            print_json(&engine.set_accommodation_active(ctx, accommodation_id, true)?)
        }

        Commands::Revoke { accommodation_id } => {
            print_json(&engine.revoke_certification(ctx, accommodation_id)?)
        }

        Commands::Show { record } => show(engine, ctx, record),

        Commands::VerifyChain => {
            let intact = engine.verify_audit_chain()?;
            print_json(&serde_json::json!({ "intact": intact }))?;
            if !intact {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn show(
    engine: &CertificationEngine<SqliteStore>,
    ctx: &CallContext,
    record: ShowCommands,
) -> anyhow::Result<()> {
    match record {
        ShowCommands::Accommodation { id } => print_json(&engine.get_accommodation(id)),
        ShowCommands::Standards { id } => print_json(&engine.get_standards(id)),
        ShowCommands::Certification { id } => print_json(&engine.get_certification(id)),
        ShowCommands::Audit { id } => print_json(&engine.get_audit_record(id)),
        ShowCommands::Audits { accommodation_id } => {
            print_json(&engine.list_audits(accommodation_id))
        }
        ShowCommands::Auditor { principal } => {
            print_json(&engine.get_auditor_info(&Principal::new(principal)?))
        }
        ShowCommands::Status { id } => print_json(&serde_json::json!({
            "height": ctx.height,
            "valid": engine.is_certification_valid(id, ctx.height),
            "level": engine.get_certification_level(id, ctx.height),
            "status": engine.certification_status(id, ctx.height),
        })),
        ShowCommands::Counters => print_json(&serde_json::json!({
            "nextAccommodationId": engine.get_next_accommodation_id(),
            "nextAuditId": engine.get_next_audit_id(),
        })),
    }
}
