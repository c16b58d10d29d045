//! Plain text output formatting.
//!
//! Produces human-readable tables with colors and formatting.

use crate::storage::OrgSummary;
use crate::types::{Category, Permission, ResultSet, TeamPrivacy, Visibility};
use console::{style, Style};
use std::io::{self, Write};

const RULE: &str = "═══════════════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────────────";

/// Write the records of one category as a table.
pub fn write_plain<W: Write>(out: &mut W, results: &ResultSet, limit: Option<usize>) -> io::Result<()> {
    let category = results.category();

    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(
        out,
        "                    {} {} audit",
        style("orgscan").cyan().bold(),
        style(category).bold()
    )?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    if results.is_empty() {
        writeln!(out, "  {}", style("No records to display.").dim())?;
        writeln!(out)?;
        return Ok(());
    }

    let shown = limit.unwrap_or(usize::MAX).min(results.len());
    writeln!(out, "  {}", style(THIN_RULE).dim())?;
    write_rows(out, results, shown)?;
    writeln!(out, "  {}", style(THIN_RULE).dim())?;

    if shown < results.len() {
        writeln!(
            out,
            "  {} of {} {} shown",
            style(shown).bold(),
            results.len(),
            unit_label(category)
        )?;
    } else {
        writeln!(out, "  {} {}", style(results.len()).bold(), unit_label(category))?;
    }
    writeln!(out)?;
    Ok(())
}

fn unit_label(category: Category) -> &'static str {
    match category {
        Category::Repositories => "repositories",
        Category::Branches => "branches",
        Category::Access => "access grants",
        Category::Members => "members",
        Category::Teams => "teams",
    }
}

fn write_rows<W: Write>(out: &mut W, results: &ResultSet, shown: usize) -> io::Result<()> {
    match results {
        ResultSet::Repositories(records) => {
            writeln!(
                out,
                "  {:<28}  {:<8}  {:>6}  {:<10}  {:<8}  {:<11}  {:>8}",
                style("REPOSITORY").bold(),
                style("VISIBLE").bold(),
                style("ADMINS").bold(),
                style("CODEOWNERS").bold(),
                style("REVIEWS").bold(),
                style("DIRECT PUSH").bold(),
                style("BRANCHES").bold()
            )?;
            for r in records.iter().take(shown) {
                let name = if r.archived {
                    format!("{} (archived)", r.repository)
                } else {
                    r.repository.clone()
                };
                writeln!(
                    out,
                    "  {:<28}  {:<8}  {:>6}  {:<10}  {:<8}  {:<11}  {:>8}",
                    truncate_string(&name, 28),
                    visibility_style(r.visibility).apply_to(r.visibility),
                    r.admin_count,
                    check(r.has_codeowners),
                    check(r.has_required_reviewers),
                    warn_if(r.allows_direct_push),
                    r.branch_count
                )?;
            }
        }
        ResultSet::Branches(records) => {
            writeln!(
                out,
                "  {:<28}  {:<28}  {:>8}  {}",
                style("REPOSITORY").bold(),
                style("BRANCH").bold(),
                style("AGE").bold(),
                style("PROTECTED").bold()
            )?;
            for r in records.iter().take(shown) {
                let age = r
                    .age_days
                    .map(|d| format!("{d}d"))
                    .unwrap_or_else(|| "-".to_string());
                writeln!(
                    out,
                    "  {:<28}  {:<28}  {:>8}  {}",
                    truncate_string(&r.repository, 28),
                    truncate_string(&r.branch_name, 28),
                    age,
                    check(r.protected)
                )?;
            }
        }
        ResultSet::Access(records) => {
            writeln!(
                out,
                "  {:<28}  {:<24}  {}",
                style("REPOSITORY").bold(),
                style("USER").bold(),
                style("PERMISSION").bold()
            )?;
            for r in records.iter().take(shown) {
                writeln!(
                    out,
                    "  {:<28}  {:<24}  {}",
                    truncate_string(&r.repository, 28),
                    truncate_string(&r.username, 24),
                    permission_style(r.permission).apply_to(r.permission)
                )?;
            }
        }
        ResultSet::Members(records) => {
            writeln!(
                out,
                "  {:<24}  {:<8}  {:<32}  {}",
                style("USER").bold(),
                style("ROLE").bold(),
                style("EMAIL").bold(),
                style("INACTIVE").bold()
            )?;
            for r in records.iter().take(shown) {
                let inactive = r
                    .days_inactive
                    .map(|d| format!("{d}d"))
                    .unwrap_or_else(|| "no activity".to_string());
                writeln!(
                    out,
                    "  {:<24}  {:<8}  {:<32}  {}",
                    truncate_string(&r.username, 24),
                    r.role,
                    truncate_string(&r.email, 32),
                    style(inactive).dim()
                )?;
            }
        }
        ResultSet::Teams(records) => {
            writeln!(
                out,
                "  {:<28}  {:<8}  {:>8}  {:>6}",
                style("TEAM").bold(),
                style("PRIVACY").bold(),
                style("MEMBERS").bold(),
                style("REPOS").bold()
            )?;
            for r in records.iter().take(shown) {
                let privacy = match r.privacy {
                    TeamPrivacy::Secret => style(r.privacy).yellow(),
                    TeamPrivacy::Closed => style(r.privacy),
                };
                writeln!(
                    out,
                    "  {:<28}  {:<8}  {:>8}  {:>6}",
                    truncate_string(&r.name, 28),
                    privacy,
                    r.members_count,
                    r.repos_count
                )?;
            }
        }
    }
    Ok(())
}

fn visibility_style(visibility: Visibility) -> Style {
    match visibility {
        Visibility::Public => Style::new().yellow(),
        Visibility::Private | Visibility::Internal => Style::new().green(),
    }
}

fn permission_style(permission: Permission) -> Style {
    match permission {
        Permission::Admin => Style::new().red().bold(),
        Permission::Maintain => Style::new().yellow(),
        Permission::Write => Style::new(),
        Permission::Read => Style::new().dim(),
    }
}

fn check(value: bool) -> console::StyledObject<&'static str> {
    if value {
        style("yes").green()
    } else {
        style("no").red()
    }
}

/// Highlight a `true` that is a finding.
fn warn_if(value: bool) -> console::StyledObject<&'static str> {
    if value {
        style("yes").red().bold()
    } else {
        style("no").green()
    }
}

/// Print repository counts for an organization.
pub fn print_summary(organization: &str, summary: &OrgSummary) {
    println!();
    println!("{} {}", style("Organization:").bold(), style(organization).cyan().bold());
    println!(
        "  {} repositories: {} active, {} archived",
        style(summary.total_repositories).bold(),
        style(summary.active_repositories).green(),
        style(summary.archived_repositories).dim()
    );
    println!(
        "  {} private, {} public",
        style(summary.private_repositories).green(),
        style(summary.public_repositories).yellow()
    );
    println!();
}

/// Print a header before scanning begins.
pub fn print_scan_header(organization: &str, categories: &[Category]) {
    let names: Vec<&str> = categories.iter().map(|c| c.as_str()).collect();
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("orgscan").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "{} Organization: {}",
        style("•").dim(),
        style(organization).white().bold()
    );
    println!("{} Auditing: {}", style("•").dim(), style(names.join(", ")).yellow());
    println!();
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Print an info message.
pub fn print_info(msg: &str) {
    println!("{} {}", style("ℹ").blue().bold(), msg);
}

/// Truncate to at most `max_len` characters, adding an ellipsis if truncated.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
