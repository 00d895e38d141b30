//! Discussion commands

use super::context::{describe, Context};
use grantvote::voting::{CommentId, CommentView, Stance, VotingToken};

fn stance_marker(stance: Stance) -> &'static str {
    match stance {
        Stance::Support => "👍",
        Stance::Oppose => "👎",
        Stance::Neutral => "💬",
    }
}

fn print_comment(comment: &CommentView) {
    let reply = comment
        .parent_id
        .map(|p| format!(" ↳ reply to #{}", p))
        .unwrap_or_default();
    println!(
        "  {} #{} {} ({}) at {}{}",
        stance_marker(comment.stance),
        comment.id,
        comment.voter_name,
        comment.voter_position,
        comment.created_at,
        reply
    );
    for line in comment.content.lines() {
        println!("     {}", line);
    }
}

pub async fn add(
    config: Option<String>,
    token: String,
    content: String,
    stance: String,
    reply_to: Option<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let stance: Stance = stance.parse()?;

    let ctx = Context::open(config).await?;
    let token = VotingToken::new(token.trim());
    let comment = ctx
        .service
        .add_comment(&token, &content, stance, reply_to.map(CommentId))
        .await
        .map_err(|e| describe(&e))?;

    println!(
        "{} Comment #{} added ({})",
        stance_marker(comment.stance),
        comment.id,
        comment.stance
    );
    Ok(())
}

pub async fn list(
    config: Option<String>,
    key: String,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open(config).await?;
    let application = ctx.find_application(&key).await?;
    let comments = ctx.service.comments(application.id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&comments)?);
        return Ok(());
    }

    if comments.is_empty() {
        println!("No comments on {}.", application.reference_code);
        return Ok(());
    }

    println!(
        "🗨️  Comments on {} ({})",
        application.reference_code,
        comments.len()
    );
    for comment in &comments {
        print_comment(comment);
    }
    Ok(())
}
