//! Token holder commands: inspect a ballot and cast a vote

use super::context::{describe, Context};
use grantvote::voting::{Ballot, VoteValue, VotingError, VotingToken};
use std::time::Duration;

pub async fn ballot(config: Option<String>, token: String) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open(config).await?;
    let token = VotingToken::new(token.trim());
    let ballot = ctx
        .service
        .ballot(&token)
        .await
        .map_err(|e| describe(&e))?;

    let application = &ballot.application;
    println!("🗳️  Ballot for {} ({})", ballot.voter_name, ballot.voter_position);
    println!();
    println!("  Reference:  {}", application.reference_code);
    println!("  Candidate:  {}", application.candidate_full_name);
    println!("  Grant Type: {}", application.grant_type.label());
    println!(
        "  Amount:     {:.2} {}",
        application.amount_requested, application.currency
    );
    println!("  Deadline:   {}", application.voting_deadline);
    println!();

    match ballot.vote {
        VoteValue::Unvoted if ballot.voting_open => println!(
            "  Not yet voted. {} left to vote.",
            humantime::format_duration(Duration::from_secs(ballot.seconds_remaining))
        ),
        VoteValue::Unvoted => println!("  Not voted; voting has closed."),
        cast => println!("  Already voted: {}", cast),
    }
    Ok(())
}

pub async fn execute(
    config: Option<String>,
    token: String,
    decision: String,
    reason: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let value: VoteValue = decision.parse()?;
    let ballot = Ballot::from_parts(value, reason)?;

    let ctx = Context::open(config).await?;
    let token = VotingToken::new(token.trim());

    match ctx.service.cast_vote(&token, ballot).await {
        Ok(record) => {
            println!("✅ Vote recorded: {}", record.state.value());
            if let Some(reason) = record.state.rejection_reason() {
                println!("   Reason: {}", reason);
            }
            Ok(())
        }
        Err(e @ VotingError::DeadlineExpired { .. }) => {
            println!("⏰ Voting for this application has closed.");
            Err(describe(&e).into())
        }
        Err(e @ VotingError::AlreadyVoted) => {
            println!("🔒 This token has already been used.");
            Err(describe(&e).into())
        }
        Err(e) => Err(describe(&e).into()),
    }
}
