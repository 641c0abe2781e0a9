//! The command surface (C9). See spec §4.5.
//!
//! Every command resolves the reviewer by `chat_id` first; absence yields
//! the uniform "please authenticate" reply spec §4.5 calls for. `start` is
//! the one exception — it has its own resolution logic, since an absent
//! reviewer there means "prompt for credentials," not "reject."

use std::str::FromStr;

use guard_protocol::Login;
use guard_protocol::Reviewer;
use guard_protocol::ReviewerSettings;
use guard_protocol::ReviewerStatus;
use guard_protocol::WhitelistEntry;
use guard_protocol::WhitelistKind;

use crate::Services;

pub(crate) async fn handle_command(services: &Services, chat_id: &str, name: &str, args: &str) {
    match name {
        "start" => handle_start(services, chat_id).await,
        "help" => services.reply(chat_id, HELP_TEXT).await,
        "logout" => handle_logout(services, chat_id).await,
        "status" => handle_status(services, chat_id).await,
        "settings" => handle_settings(services, chat_id).await,
        "whitelist" => handle_whitelist_list(services, chat_id).await,
        "whitelist_add" => handle_whitelist_add(services, chat_id, args).await,
        "whitelist_remove" => handle_whitelist_remove(services, chat_id, args).await,
        "set_response_deadline_shift" => handle_set_numeric(services, chat_id, "response_deadline_shift_minutes", args).await,
        "set_non_whitelist_cancel_delay" => handle_set_numeric(services, chat_id, "non_whitelist_cancel_delay_minutes", args).await,
        "set_slot_shift_threshold" => handle_set_numeric(services, chat_id, "slot_shift_threshold_minutes", args).await,
        "set_slot_shift_duration" => handle_set_numeric(services, chat_id, "slot_shift_duration_minutes", args).await,
        "set_cleanup_duration" => handle_set_cleanup_duration(services, chat_id, args).await,
        "set_notify_whitelist_timeout" => handle_set_bool(services, chat_id, "notify_whitelist_timeout", args).await,
        "set_notify_non_whitelist_cancel" => handle_set_bool(services, chat_id, "notify_non_whitelist_cancel", args).await,
        _ => {
            services.reply(chat_id, "unknown command, send /help for the list of commands").await;
        }
    }
}

const HELP_TEXT: &str = "Commands: start, logout, status, settings, \
whitelist, whitelist_add <kind> <name>, whitelist_remove <name>, \
set_response_deadline_shift, set_non_whitelist_cancel_delay, \
set_slot_shift_threshold, set_slot_shift_duration, set_cleanup_duration, \
set_notify_whitelist_timeout, set_notify_non_whitelist_cancel.";

/// Resolve the reviewer for `chat_id`, sending the uniform
/// "please authenticate" reply and returning `None` if absent. Shared by
/// every command except `start`.
async fn resolve_reviewer(services: &Services, chat_id: &str) -> Option<Reviewer> {
    match services.store.get_reviewer_by_chat_id(chat_id).await {
        Ok(Some(reviewer)) => Some(reviewer),
        Ok(None) => {
            services.reply(chat_id, "please authenticate: send /start").await;
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, chat_id, "get_reviewer_by_chat_id failed");
            services.reply(chat_id, "try again later").await;
            None
        }
    }
}

async fn handle_start(services: &Services, chat_id: &str) {
    match services.store.get_reviewer_by_chat_id(chat_id).await {
        Ok(Some(reviewer)) if reviewer.status == ReviewerStatus::Active => {
            services.reply(chat_id, &format!("Welcome back, {}.", reviewer.login)).await;
        }
        Ok(_) => {
            services.reply(chat_id, "Send your school credentials as login:password to get started.").await;
        }
        Err(err) => {
            tracing::warn!(error = %err, chat_id, "get_reviewer_by_chat_id failed");
            services.reply(chat_id, "try again later").await;
        }
    }
}

async fn handle_logout(services: &Services, chat_id: &str) {
    let Some(reviewer) = resolve_reviewer(services, chat_id).await else {
        return;
    };
    if let Err(err) = services.vault.delete(&reviewer.login).await {
        tracing::warn!(error = %err, login = %reviewer.login, "vault delete failed during logout");
    }
    if let Err(err) = services.store.set_reviewer_status(&reviewer.login, ReviewerStatus::LoggedOut).await {
        tracing::warn!(error = %err, login = %reviewer.login, "set_reviewer_status failed during logout");
        services.reply(chat_id, "logout failed, try again").await;
        return;
    }
    services.reply(chat_id, "Logged out. Send /start to reconnect.").await;
}

async fn handle_status(services: &Services, chat_id: &str) {
    let Some(reviewer) = resolve_reviewer(services, chat_id).await else {
        return;
    };
    let open = match services.store.list_open_reviews(&reviewer.login).await {
        Ok(open) => open,
        Err(err) => {
            tracing::warn!(error = %err, login = %reviewer.login, "list_open_reviews failed");
            services.reply(chat_id, "try again later").await;
            return;
        }
    };
    if open.is_empty() {
        services.reply(chat_id, &format!("{}: no open reviews.", reviewer.login)).await;
        return;
    }
    let mut lines = vec![format!("{}: {} open review(s)", reviewer.login, open.len())];
    for review in &open {
        let label = review.project_name.as_deref().unwrap_or("(project pending)");
        lines.push(format!("- {label} [{}]", review.status));
    }
    services.reply(chat_id, &lines.join("\n")).await;
}

async fn handle_settings(services: &Services, chat_id: &str) {
    let Some(reviewer) = resolve_reviewer(services, chat_id).await else {
        return;
    };
    let settings = services
        .store
        .get_reviewer_settings(&reviewer.login)
        .await
        .ok()
        .flatten()
        .unwrap_or_else(ReviewerSettings::defaults);
    services.reply(chat_id, &render_settings(&settings)).await;
}

fn render_settings(settings: &ReviewerSettings) -> String {
    format!(
        "response_deadline_shift: {} min\n\
         non_whitelist_cancel_delay: {} min\n\
         notify_whitelist_timeout: {}\n\
         notify_non_whitelist_cancel: {}\n\
         slot_shift_threshold: {} min\n\
         slot_shift_duration: {} min\n\
         cleanup_duration: {} min",
        settings.response_deadline_shift_minutes,
        settings.non_whitelist_cancel_delay_minutes,
        settings.notify_whitelist_timeout,
        settings.notify_non_whitelist_cancel,
        settings.slot_shift_threshold_minutes,
        settings.slot_shift_duration_minutes,
        settings.cleanup_duration_minutes,
    )
}

async fn handle_whitelist_list(services: &Services, chat_id: &str) {
    let Some(reviewer) = resolve_reviewer(services, chat_id).await else {
        return;
    };
    let entries = match services.store.list_whitelist(&reviewer.login).await {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(error = %err, login = %reviewer.login, "list_whitelist failed");
            services.reply(chat_id, "try again later").await;
            return;
        }
    };
    if entries.is_empty() {
        services.reply(chat_id, "whitelist is empty").await;
        return;
    }
    let lines: Vec<String> = entries.iter().map(|entry| format!("- {} {}", entry.kind, entry.value)).collect();
    services.reply(chat_id, &lines.join("\n")).await;
}

async fn handle_whitelist_add(services: &Services, chat_id: &str, args: &str) {
    let Some(reviewer) = resolve_reviewer(services, chat_id).await else {
        return;
    };
    let Some((kind, name)) = parse_kind_and_name(args) else {
        services.reply(chat_id, "usage: whitelist_add <family|project> <name>").await;
        return;
    };
    let entry = WhitelistEntry::new(reviewer.login.clone(), kind, name);
    if let Err(err) = services.store.add_whitelist_entry(&entry).await {
        tracing::warn!(error = %err, login = %reviewer.login, "add_whitelist_entry failed");
        services.reply(chat_id, "try again later").await;
        return;
    }
    services.reply(chat_id, &format!("added {} {} to the whitelist", entry.kind, entry.value)).await;
}

async fn handle_whitelist_remove(services: &Services, chat_id: &str, args: &str) {
    let Some(reviewer) = resolve_reviewer(services, chat_id).await else {
        return;
    };
    let name = args.trim();
    if name.is_empty() {
        services.reply(chat_id, "usage: whitelist_remove <name>").await;
        return;
    }
    let mut removed = 0u64;
    for kind in [WhitelistKind::Family, WhitelistKind::Project] {
        let entry = WhitelistEntry::new(reviewer.login.clone(), kind, name);
        match services.store.remove_whitelist_entry(&entry).await {
            Ok(n) => removed += n,
            Err(err) => tracing::warn!(error = %err, login = %reviewer.login, "remove_whitelist_entry failed"),
        }
    }
    if removed == 0 {
        services.reply(chat_id, &format!("{name} is not on the whitelist")).await;
    } else {
        services.reply(chat_id, &format!("removed {name} from the whitelist")).await;
    }
}

/// `<kind> <name>`, `kind` case-insensitively `family` or `project`.
fn parse_kind_and_name(args: &str) -> Option<(WhitelistKind, &str)> {
    let mut parts = args.trim().splitn(2, char::is_whitespace);
    let kind_str = parts.next()?;
    let name = parts.next()?.trim();
    if name.is_empty() {
        return None;
    }
    let kind = WhitelistKind::from_str(&kind_str.to_ascii_uppercase()).ok()?;
    Some((kind, name))
}

async fn handle_set_numeric(services: &Services, chat_id: &str, field: &'static str, args: &str) {
    let Some(reviewer) = resolve_reviewer(services, chat_id).await else {
        return;
    };
    let Ok(value) = args.trim().parse::<i64>() else {
        let allowed = ReviewerSettings::range_for(field).expect("known field");
        services
            .reply(chat_id, &format!("usage: a whole number between {} and {} in steps of {}", allowed.min, allowed.max, allowed.step))
            .await;
        return;
    };

    let current = services
        .store
        .get_reviewer_settings(&reviewer.login)
        .await
        .ok()
        .flatten()
        .unwrap_or_else(ReviewerSettings::defaults);
    match current.with_field(field, value) {
        Ok(updated) => apply_settings(services, chat_id, &reviewer.login, updated).await,
        Err(err) => {
            services.reply(chat_id, &err.to_string()).await;
        }
    }
}

async fn handle_set_cleanup_duration(services: &Services, chat_id: &str, args: &str) {
    let Some(reviewer) = resolve_reviewer(services, chat_id).await else {
        return;
    };
    let Ok(value) = args.trim().parse::<i64>() else {
        services
            .reply(chat_id, &format!("usage: one of {:?}", ReviewerSettings::cleanup_duration_allowed()))
            .await;
        return;
    };
    let current = services
        .store
        .get_reviewer_settings(&reviewer.login)
        .await
        .ok()
        .flatten()
        .unwrap_or_else(ReviewerSettings::defaults);
    match current.with_cleanup_duration(value) {
        Ok(updated) => apply_settings(services, chat_id, &reviewer.login, updated).await,
        Err(err) => {
            services.reply(chat_id, &err.to_string()).await;
        }
    }
}

async fn handle_set_bool(services: &Services, chat_id: &str, field: &'static str, args: &str) {
    let Some(reviewer) = resolve_reviewer(services, chat_id).await else {
        return;
    };
    let Some(value) = parse_bool(args) else {
        services.reply(chat_id, "usage: true or false").await;
        return;
    };
    let current = services
        .store
        .get_reviewer_settings(&reviewer.login)
        .await
        .ok()
        .flatten()
        .unwrap_or_else(ReviewerSettings::defaults);
    match current.with_bool_field(field, value) {
        Ok(updated) => apply_settings(services, chat_id, &reviewer.login, updated).await,
        Err(err) => {
            services.reply(chat_id, &err.to_string()).await;
        }
    }
}

fn parse_bool(args: &str) -> Option<bool> {
    match args.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

async fn apply_settings(services: &Services, chat_id: &str, login: &Login, updated: ReviewerSettings) {
    if let Err(err) = services.store.update_reviewer_settings(login, updated).await {
        tracing::warn!(error = %err, %login, "update_reviewer_settings failed");
        services.reply(chat_id, "try again later").await;
        return;
    }
    services.reply(chat_id, &render_settings(&updated)).await;
}
