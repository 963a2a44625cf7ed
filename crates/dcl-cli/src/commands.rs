use anyhow::{bail, Context};
use colored::Colorize;
use dcl_compliance::Finding;
use dcl_ledger::{
    BalanceView, BeneficiaryRef, CessionOutcome, CessionRecord, CorrectUsage, CreateCession,
    DeclareUsage, DelegationLedger, InMemoryLedger, ReverseCession, UsageOutcome, UsageRecord,
};
use dcl_server::{DclServer, ServerConfig};
use dcl_types::{Clock, CreditMonth, MembershipStatus, Representative, SystemClock};
use serde::Serialize;

use crate::cli::*;

type Ledger = DelegationLedger<InMemoryLedger>;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let format = cli.format;
    let ledger = || open_ledger(&config);

    match cli.command {
        Command::Serve(args) => cmd_serve(config.clone(), args),
        Command::Designate(args) => cmd_designate(&ledger()?, &config, format, args),
        Command::Archive(args) => cmd_archive(&ledger()?, &config, format, args),
        Command::Balance(args) => cmd_balance(&ledger()?, &config, format, args),
        Command::Declare(args) => cmd_declare(&ledger()?, &config, format, args),
        Command::Approve(args) => cmd_approve(&ledger()?, &config, format, args),
        Command::Correct(args) => cmd_correct(&ledger()?, &config, format, args),
        Command::Cede(args) => cmd_cede(&ledger()?, &config, format, args),
        Command::Reverse(args) => cmd_reverse(&ledger()?, &config, format, args),
        Command::History(args) => cmd_history(&ledger()?, format, args),
        Command::Rollover(args) => cmd_rollover(&ledger()?, &config, format, args),
        Command::Audit => cmd_audit(&ledger()?, format),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if cli.state.is_some() {
        config.state_path = cli.state.clone();
    }
    Ok(config)
}

fn open_ledger(config: &ServerConfig) -> anyhow::Result<Ledger> {
    let store = match &config.state_path {
        Some(path) => InMemoryLedger::load(path)
            .with_context(|| format!("loading state file {}", path.display()))?,
        None => {
            tracing::warn!("no state file configured; changes will not be kept");
            InMemoryLedger::new()
        }
    };
    Ok(DelegationLedger::new(store, config.ledger.clone())?)
}

fn save(ledger: &Ledger, config: &ServerConfig) -> anyhow::Result<()> {
    if let Some(path) = &config.state_path {
        ledger
            .store()
            .save(path)
            .with_context(|| format!("writing state file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "state file written");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_serve(mut config: ServerConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.bind_addr = bind
            .parse()
            .with_context(|| format!("invalid bind address {bind:?}"))?;
    }
    let server = DclServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_designate(
    ledger: &Ledger,
    config: &ServerConfig,
    format: OutputFormat,
    args: DesignateArgs,
) -> anyhow::Result<()> {
    let status = if args.substitute {
        MembershipStatus::Substitute
    } else {
        MembershipStatus::Titular
    };
    let representative = ledger.designate(Representative {
        id: args.id,
        name: args.name,
        class: args.class,
        status,
        mandate_start: args.start,
        mandate_end: args.end,
        archived: false,
    })?;
    save(ledger, config)?;

    match format {
        OutputFormat::Json => print_json(&representative),
        OutputFormat::Text => {
            println!(
                "{} Designated {} ({})",
                "✓".green().bold(),
                representative.id.as_str().bold(),
                representative.name
            );
            println!("  Class: {}", representative.class.to_string().cyan());
            if representative.is_substitute() {
                println!("  Seat: {}", "substitute (no base credit)".yellow());
            }
            let base = config.ledger.base_credit(&representative);
            println!("  Monthly base: {}", base.to_string().bold());
            Ok(())
        }
    }
}

fn cmd_archive(
    ledger: &Ledger,
    config: &ServerConfig,
    format: OutputFormat,
    args: ArchiveArgs,
) -> anyhow::Result<()> {
    let representative = ledger.archive(&args.id, args.end)?;
    save(ledger, config)?;
    match format {
        OutputFormat::Json => print_json(&representative),
        OutputFormat::Text => {
            println!(
                "{} Mandate of {} ends {}",
                "✓".green().bold(),
                representative.id.as_str().bold(),
                args.end
            );
            Ok(())
        }
    }
}

fn cmd_balance(
    ledger: &Ledger,
    config: &ServerConfig,
    format: OutputFormat,
    args: BalanceArgs,
) -> anyhow::Result<()> {
    let month = args
        .month
        .unwrap_or_else(|| CreditMonth::from_date(SystemClock.today()));
    let view = ledger.delegate_balance(&args.id, month)?;
    // Reading a month may open it.
    save(ledger, config)?;
    match format {
        OutputFormat::Json => print_json(&view),
        OutputFormat::Text => {
            print_balance(&view);
            Ok(())
        }
    }
}

fn print_balance(view: &BalanceView) {
    let period = &view.period;
    let available = view.balance.available;
    let shown = if available.is_negative() {
        available.to_string().red().bold()
    } else {
        available.to_string().green().bold()
    };
    println!("{} {}", period.key().to_string().bold(), shown);
    println!(
        "  Base {}  carried {}  received {}",
        period.base(),
        period.carried_over(),
        period.received()
    );
    println!(
        "  Used {} / {} / {}  (received / carried / base)",
        period.used_from_received(),
        period.used_from_carried(),
        period.used_from_base()
    );
    println!(
        "  Ceded {} / {}  (base / carried)",
        period.ceded_from_base(),
        period.ceded_from_carried()
    );
    if period.overage().is_positive() {
        println!("  Overage: {}", period.overage().to_string().red());
    }
    for tranche in period.carried_tranches() {
        println!("  Tranche from {}: {}", tranche.origin, tranche.hours);
    }
}

fn print_findings(findings: &[Finding]) {
    for finding in findings {
        println!("  {} {}", finding.code.to_string().red(), finding.message);
    }
}

fn cmd_declare(
    ledger: &Ledger,
    config: &ServerConfig,
    format: OutputFormat,
    args: DeclareArgs,
) -> anyhow::Result<()> {
    let outcome = ledger.declare_usage(&DeclareUsage {
        representative: args.id,
        date: args.date,
        hours: args.hours,
        category: args.category,
        justification: args.justification,
    })?;
    report_usage(ledger, config, format, outcome)
}

fn report_usage(
    ledger: &Ledger,
    config: &ServerConfig,
    format: OutputFormat,
    outcome: UsageOutcome,
) -> anyhow::Result<()> {
    if outcome.is_committed() {
        save(ledger, config)?;
    }
    if format == OutputFormat::Json {
        print_json(&outcome)?;
    }
    match outcome {
        UsageOutcome::Committed { record, balance } => {
            if format == OutputFormat::Text {
                print_usage(&record);
                print_balance(&balance);
            }
            Ok(())
        }
        UsageOutcome::Rejected { violations } => {
            if format == OutputFormat::Text {
                println!("{} Declaration rejected", "✗".red().bold());
                print_findings(&violations);
            }
            bail!("declaration rejected with {} violation(s)", violations.len())
        }
    }
}

fn print_usage(record: &UsageRecord) {
    let marker = if record.is_correction() {
        "↺".yellow()
    } else {
        "✓".green()
    };
    println!(
        "{} {} {} {:?} on {} [{}]",
        marker,
        record.id.short_id().dimmed(),
        record.hours.to_string().bold(),
        record.category,
        record.date,
        record.approval
    );
    if record.requires_authorization() {
        println!(
            "  {} {} beyond the available credit",
            "needs authorization:".yellow(),
            record.allocation.overage
        );
    }
}

fn cmd_approve(
    ledger: &Ledger,
    config: &ServerConfig,
    format: OutputFormat,
    args: RecordArgs,
) -> anyhow::Result<()> {
    let id = args
        .id
        .parse()
        .with_context(|| format!("invalid usage id {:?}", args.id))?;
    let record = ledger.approve_usage(&id)?;
    save(ledger, config)?;
    match format {
        OutputFormat::Json => print_json(&record),
        OutputFormat::Text => {
            print_usage(&record);
            Ok(())
        }
    }
}

fn cmd_correct(
    ledger: &Ledger,
    config: &ServerConfig,
    format: OutputFormat,
    args: CorrectArgs,
) -> anyhow::Result<()> {
    let id = args
        .id
        .parse()
        .with_context(|| format!("invalid usage id {:?}", args.id))?;
    let outcome = ledger.correct_usage(&id, &CorrectUsage { reason: args.reason })?;
    report_usage(ledger, config, format, outcome)
}

fn cmd_cede(
    ledger: &Ledger,
    config: &ServerConfig,
    format: OutputFormat,
    args: CedeArgs,
) -> anyhow::Result<()> {
    let beneficiary = match (args.to, args.external) {
        (Some(id), _) => BeneficiaryRef::Internal { id },
        (None, Some(name)) => BeneficiaryRef::External { name },
        (None, None) => bail!("either --to or --external is required"),
    };
    let outcome = ledger.create_cession(&CreateCession {
        donor: args.donor,
        beneficiary,
        hours: args.hours,
        effective_date: args.date,
        reason: args.reason,
        created_by: args.by,
        force_override_notice: args.force,
    })?;
    report_cession(ledger, config, format, outcome)
}

fn cmd_reverse(
    ledger: &Ledger,
    config: &ServerConfig,
    format: OutputFormat,
    args: ReverseArgs,
) -> anyhow::Result<()> {
    let id = args
        .id
        .parse()
        .with_context(|| format!("invalid cession id {:?}", args.id))?;
    let outcome = ledger.reverse_cession(
        &id,
        &ReverseCession {
            reason: args.reason,
            created_by: args.by,
        },
    )?;
    report_cession(ledger, config, format, outcome)
}

fn report_cession(
    ledger: &Ledger,
    config: &ServerConfig,
    format: OutputFormat,
    outcome: CessionOutcome,
) -> anyhow::Result<()> {
    if outcome.is_committed() {
        save(ledger, config)?;
    }
    if format == OutputFormat::Json {
        print_json(&outcome)?;
    }
    match outcome {
        CessionOutcome::Committed {
            record,
            donor_balance,
            beneficiary_balance,
        } => {
            if format == OutputFormat::Text {
                print_cession(&record);
                print_balance(&donor_balance);
                if let Some(view) = beneficiary_balance {
                    print_balance(&view);
                }
            }
            Ok(())
        }
        CessionOutcome::Rejected {
            violations,
            warnings,
        } => {
            if format == OutputFormat::Text {
                println!("{} Cession rejected", "✗".red().bold());
                print_findings(&violations);
                print_findings(&warnings);
            }
            bail!("cession rejected with {} violation(s)", violations.len())
        }
        CessionOutcome::ConfirmationRequired { warnings } => {
            if format == OutputFormat::Text {
                println!("{} Cession needs confirmation", "!".yellow().bold());
                print_findings(&warnings);
                println!("  Re-run with {} to commit anyway.", "--force".bold());
            }
            bail!("cession not committed: confirmation required")
        }
    }
}

fn print_cession(record: &CessionRecord) {
    let marker = if record.is_reversal() {
        "↺".yellow()
    } else {
        "→".green()
    };
    let target = if record.beneficiary.is_external() {
        format!("{} (external)", record.beneficiary.name())
    } else {
        record.beneficiary.name().to_string()
    };
    println!(
        "{} #{} {} {} {} {} on {}",
        marker,
        record.seq,
        record.id.short_id().dimmed(),
        record.donor.as_str().bold(),
        record.hours.to_string().bold(),
        target,
        record.effective_date
    );
    println!(
        "  from base {}  from carried {}  by {}",
        record.source.from_base, record.source.from_carried, record.created_by
    );
    if !record.reason.is_empty() {
        println!("  Reason: {}", record.reason);
    }
    if record.notice_overridden {
        println!("  {}", "notice period overridden".yellow());
    }
}

#[derive(Serialize)]
struct History {
    cessions: Vec<CessionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<Vec<UsageRecord>>,
}

fn cmd_history(ledger: &Ledger, format: OutputFormat, args: HistoryArgs) -> anyhow::Result<()> {
    let history = History {
        cessions: ledger.cession_history(&args.id)?,
        usage: args
            .month
            .map(|month| ledger.usage_history(&args.id, month))
            .transpose()?,
    };
    match format {
        OutputFormat::Json => print_json(&history),
        OutputFormat::Text => {
            if history.cessions.is_empty() {
                println!("No cessions.");
            }
            for record in &history.cessions {
                print_cession(record);
            }
            if let Some(usage) = &history.usage {
                if usage.is_empty() {
                    println!("No usage recorded.");
                }
                for record in usage {
                    print_usage(record);
                }
            }
            Ok(())
        }
    }
}

fn cmd_rollover(
    ledger: &Ledger,
    config: &ServerConfig,
    format: OutputFormat,
    args: RolloverArgs,
) -> anyhow::Result<()> {
    let report = ledger.rollover(args.month)?;
    if !report.opened.is_empty() {
        save(ledger, config)?;
    }
    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            println!(
                "{} {}: {} opened, {} already open",
                "✓".green().bold(),
                report.month.to_string().bold(),
                report.opened.len(),
                report.already_open
            );
            for id in &report.opened {
                println!("  {}", id.as_str());
            }
            Ok(())
        }
    }
}

fn cmd_audit(ledger: &Ledger, format: OutputFormat) -> anyhow::Result<()> {
    let report = ledger.audit()?;
    if format == OutputFormat::Json {
        print_json(&report)?;
    } else if report.is_valid() {
        println!(
            "{} {} periods consistent with their records",
            "✓".green().bold(),
            report.periods_checked
        );
    } else {
        println!("{} {} breach(es)", "✗".red().bold(), report.breaches.len());
        for breach in &report.breaches {
            println!(
                "  {} {:?}: {}",
                breach.period.to_string().bold(),
                breach.kind,
                breach.description
            );
        }
    }
    if !report.is_valid() {
        bail!("ledger audit found {} breach(es)", report.breaches.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use dcl_types::{Hours, RepresentativeId};
    use std::path::Path;

    fn run(state: &Path, args: &[&str]) -> anyhow::Result<()> {
        let state = state.to_string_lossy().into_owned();
        let mut argv = vec!["dcl", "--state", state.as_str(), "--format", "json"];
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv)?)
    }

    fn reload(state: &Path) -> Ledger {
        DelegationLedger::new(InMemoryLedger::load(state).unwrap(), Default::default()).unwrap()
    }

    fn id(raw: &str) -> RepresentativeId {
        RepresentativeId::new(raw).unwrap()
    }

    #[test]
    fn state_file_survives_between_invocations() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("ledger.json");

        run(&state, &["designate", "EMP-1", "--name", "Ada", "--class", "council_member", "--start", "2024-01-01"]).unwrap();
        run(&state, &["designate", "EMP-2", "--name", "Bo", "--class", "council_member", "--substitute", "--start", "2024-01-01"]).unwrap();
        run(&state, &["declare", "EMP-1", "3h", "--date", "2024-03-05"]).unwrap();
        run(&state, &["cede", "EMP-1", "2h", "--to", "EMP-2", "--date", "2024-03-20", "--reason", "plenary", "--force"]).unwrap();

        let ledger = reload(&state);
        let march: CreditMonth = "2024-03".parse().unwrap();
        let donor = ledger.delegate_balance(&id("EMP-1"), march).unwrap();
        assert_eq!(donor.balance.available, Hours::from_hours(17));
        let recipient = ledger.delegate_balance(&id("EMP-2"), march).unwrap();
        assert_eq!(recipient.balance.available, Hours::from_hours(2));
        assert_eq!(ledger.cession_history(&id("EMP-2")).unwrap().len(), 1);

        run(&state, &["audit"]).unwrap();
    }

    #[test]
    fn rejected_declaration_is_an_error_and_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("ledger.json");
        run(&state, &["designate", "EMP-1", "--name", "Ada", "--class", "council_member", "--start", "2024-01-01"]).unwrap();

        assert!(run(&state, &["declare", "EMP-1", "0", "--date", "2024-03-05"]).is_err());
        let ledger = reload(&state);
        let march: CreditMonth = "2024-03".parse().unwrap();
        assert!(ledger.usage_history(&id("EMP-1"), march).unwrap().is_empty());
    }

    #[test]
    fn unknown_representative_fails() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("ledger.json");
        assert!(run(&state, &["balance", "NOBODY", "2024-03"]).is_err());
    }

    #[test]
    fn rollover_opens_active_representatives() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("ledger.json");
        run(&state, &["designate", "EMP-1", "--name", "Ada", "--class", "union_delegate", "--start", "2024-01-01"]).unwrap();
        run(&state, &["rollover", "2024-05"]).unwrap();

        let ledger = reload(&state);
        let may: CreditMonth = "2024-05".parse().unwrap();
        assert!(ledger.store().snapshot().unwrap().periods.iter().any(|p| p.month() == may));
    }
}
