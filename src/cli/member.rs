//! Roster commands

use super::context::Context;
use grantvote::voting::{MemberId, MemberUpdate, VotingMember};

fn print_member(member: &VotingMember) {
    let marker = if member.is_active { "✅" } else { "⏸️ " };
    println!(
        "  {} #{:<4} {} ({}) <{}>",
        marker, member.id, member.name, member.position, member.email
    );
}

pub async fn add(
    config: Option<String>,
    name: String,
    position: String,
    email: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open(config).await?;
    let member = ctx.service.add_member(&name, &position, &email).await?;

    println!("✅ Added voting member #{}", member.id);
    print_member(&member);
    Ok(())
}

pub async fn list(config: Option<String>, active_only: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open(config).await?;
    let members: Vec<_> = ctx
        .service
        .list_members()
        .await?
        .into_iter()
        .filter(|m| m.is_active || !active_only)
        .collect();

    if members.is_empty() {
        println!("No voting members.");
        return Ok(());
    }

    println!("👥 Voting members ({})", members.len());
    for member in &members {
        print_member(member);
    }
    Ok(())
}

pub async fn update(
    config: Option<String>,
    id: i64,
    name: Option<String>,
    position: Option<String>,
    email: Option<String>,
    active: Option<bool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let update = MemberUpdate {
        name,
        position,
        email,
        is_active: active,
    };
    if update == MemberUpdate::default() {
        return Err("Nothing to update (pass --name, --position, --email or --active)".into());
    }

    let ctx = Context::open(config).await?;
    let member = ctx.service.update_member(MemberId(id), update).await?;

    println!("✅ Updated voting member #{}", member.id);
    print_member(&member);
    Ok(())
}

pub async fn deactivate(config: Option<String>, id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open(config).await?;
    let member = ctx.service.deactivate_member(MemberId(id)).await?;

    println!("⏸️  Deactivated voting member #{}", member.id);
    println!("   Tokens already issued to {} remain valid.", member.name);
    Ok(())
}
