use super::context::Context;
use grantvote::voting::VoteValue;

/// Show vote results for an application
///
/// Counts are derived from the issued tokens at the time of the call; the
/// total is the number of tokens issued, not the current roster size.
pub async fn execute(
    config: Option<String>,
    key: String,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open(config).await?;
    let application = ctx.find_application(&key).await?;
    let results = ctx.service.results(application.id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    let s = results.summary;
    println!(
        "📊 Results for {} ({})",
        results.application.reference_code, results.application.candidate_full_name
    );
    println!();
    println!("  ✅ Accept:  {}", s.accept);
    println!("  ❌ Reject:  {}", s.reject);
    println!("  ⏳ Pending: {}", s.unvoted);
    println!("  {} of {} votes cast", s.voted, s.total);

    if !results.ballots.is_empty() {
        println!();
        println!("  Ballots:");
        for ballot in &results.ballots {
            let when = ballot
                .voted_at
                .map(|t| format!(" at {}", t))
                .unwrap_or_default();
            println!(
                "    {:<8} {} ({}){}",
                ballot.vote.as_str(), ballot.voter_name, ballot.voter_position, when
            );
            if ballot.vote == VoteValue::Reject {
                if let Some(reason) = &ballot.rejection_reason {
                    println!("             reason: {}", reason);
                }
            }
        }
    }
    Ok(())
}
