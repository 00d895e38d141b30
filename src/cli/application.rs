//! Application commands

use super::context::Context;
use grantvote::voting::deadline;
use grantvote::voting::{GrantApplication, IssuanceReport, NewApplication};

/// Raw `create-application` arguments
pub struct CreateArgs {
    pub submitter: String,
    pub candidate: String,
    pub grant_type: String,
    pub date: String,
    pub place: String,
    pub amount: String,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub deadline: String,
}

fn print_application(application: &GrantApplication) {
    println!("  Reference:  {}", application.reference_code);
    println!("  Candidate:  {}", application.candidate_full_name);
    println!("  Submitter:  {}", application.submitter_name);
    println!("  Grant Type: {}", application.grant_type.label());
    println!("  Date:       {}", application.date);
    println!("  Place:      {}", application.place);
    println!(
        "  Amount:     {:.2} {}",
        application.amount_requested, application.currency
    );
    println!("  Deadline:   {}", application.voting_deadline);
    if !application.description.is_empty() {
        println!("  Description:");
        for line in application.description.lines() {
            println!("    {}", line);
        }
    }
}

fn print_report(report: &IssuanceReport) {
    println!(
        "🎟️  Issued {} voting tokens, {} invitations delivered",
        report.issued.len(),
        report.notified()
    );
    for failure in &report.notification_failures {
        println!(
            "  ⚠️  Invitation to {} (member #{}) failed: {}",
            failure.email, failure.member_id, failure.reason
        );
    }
}

pub async fn create(config: Option<String>, args: CreateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let application = NewApplication::parse(
        &args.submitter,
        &args.candidate,
        &args.grant_type,
        &args.date,
        &args.place,
        &args.amount,
        args.currency.as_deref(),
        args.description.as_deref(),
        &args.deadline,
    )?;

    let ctx = Context::open(config).await?;
    let report = ctx.service.create_application(application).await?;

    println!(
        "✅ Created application {} (#{})",
        report.application.reference_code, report.application.id
    );
    print_application(&report.application);
    println!();
    print_report(&report);
    if report.issued.is_empty() {
        println!("  No active voting members; nobody can vote on this application.");
    }
    Ok(())
}

pub async fn show(
    config: Option<String>,
    key: String,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open(config).await?;
    let application = ctx.find_application(&key).await?;
    let detail = ctx.service.application_detail(application.id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    let status = if detail.voting_open { "🟢 open" } else { "🔴 closed" };
    println!(
        "📄 Application {} (#{}), voting {}",
        detail.application.reference_code, detail.application.id, status
    );
    print_application(&detail.application);
    println!();
    let s = detail.summary;
    println!(
        "  Votes: {} accept, {} reject, {} pending ({} of {} cast)",
        s.accept, s.reject, s.unvoted, s.voted, s.total
    );
    Ok(())
}

pub async fn list(config: Option<String>, all: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open(config).await?;
    let now = ctx.service.now();
    let applications: Vec<_> = ctx
        .service
        .list_applications()
        .await?
        .into_iter()
        .filter(|a| a.is_active || all)
        .collect();

    if applications.is_empty() {
        println!("No applications.");
        return Ok(());
    }

    println!("📋 Applications ({})", applications.len());
    for application in &applications {
        let marker = if deadline::is_open(application, now) {
            "🟢"
        } else {
            "🔴"
        };
        println!(
            "  {} #{:<4} {}  {:<28} {:<36} deadline {}",
            marker,
            application.id,
            application.reference_code,
            application.candidate_full_name,
            application.grant_type.label(),
            application.voting_deadline
        );
    }
    Ok(())
}

pub async fn close(config: Option<String>, key: String) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open(config).await?;
    let application = ctx.find_application(&key).await?;
    ctx.service.close_application(application.id).await?;

    println!("🗄️  Closed application {}", application.reference_code);
    if deadline::is_open(&application, ctx.service.now()) {
        println!("   Voting stays open until {}.", application.voting_deadline);
    }
    Ok(())
}
