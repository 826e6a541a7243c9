use anyhow::Result;
use colored::*;
use dialoguer::{Confirm, Editor, Input, Select};
use std::time::Duration;

use crate::api::versionone::VersionOneClient;
use crate::api::DefectTracker;
use crate::config::fields::{parse_max_name_length, Field, FieldKind};
use crate::config::settings::{ConfigStore, Settings};
use crate::errors::{self, BridgeError};
use crate::models::asset::{AssetOption, ReferenceLists};
use crate::surface::Notifier;

pub const FETCH_VALUES_FAILED_MESSAGE: &str =
    "Unable to fetch available values for defect properties from VersionOne.";

/// One editable entry of the preferences form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub field: Field,
    pub current: Option<String>,
    /// Choices for asset fields; empty otherwise.
    pub options: Vec<AssetOption>,
}

impl FormField {
    /// Index of the stored choice among `options`.
    pub fn selected_index(&self) -> Option<usize> {
        let current = self.current.as_deref()?;
        self.options
            .iter()
            .position(|option| option.to_string() == current)
    }
}

/// Fields the form exposes. Until a base URL is known only that field is shown.
pub fn build_form(prefs: &ConfigStore, lists: &ReferenceLists) -> Vec<FormField> {
    let has_base_url = prefs.v1_base_url().is_some();

    Field::ALL
        .into_iter()
        .filter(|field| has_base_url || *field == Field::V1BaseUrl)
        .map(|field| FormField {
            field,
            current: prefs
                .get_raw_value(field)
                .map(str::to_string)
                .or_else(|| field.default_value()),
            options: if field.is_asset() {
                lists.get(&field).cloned().unwrap_or_default()
            } else {
                Vec::new()
            },
        })
        .collect()
}

/// Stores the answers and reports whether the base URL changed.
pub fn apply_answers(prefs: &mut ConfigStore, answers: Vec<(Field, String)>) -> bool {
    let before = prefs.v1_base_url().map(str::to_string);
    for (field, value) in answers {
        prefs.set_value(field, value.trim_end().to_string());
    }
    prefs.v1_base_url().map(str::to_string) != before
}

/// Fetches asset choices, telling the user when VersionOne cannot be reached.
pub async fn fetch_reference_lists(
    defects: &dyn DefectTracker,
    notifier: &dyn Notifier,
) -> errors::Result<ReferenceLists> {
    match defects.get_reference_lists().await {
        Ok(lists) => Ok(lists),
        Err(err) => {
            notifier.alert(FETCH_VALUES_FAILED_MESSAGE);
            Err(BridgeError::ReferenceListsUnavailable(format!("{:#}", err)))
        }
    }
}

/// Interactive preferences flow. Reopens itself when the base URL changes so
/// the asset lists come from the new instance.
pub async fn run(settings: &mut Settings, notifier: &dyn Notifier) -> errors::Result<()> {
    loop {
        println!("{}", "Preferences".cyan().bold());
        println!();

        let lists = match settings.preferences.v1_base_url() {
            Some(base_url) => {
                println!("{}", "  Fetching available values from VersionOne...".dimmed());
                let client = VersionOneClient::new(
                    base_url.to_string(),
                    settings.versionone.access_token.clone(),
                )
                .with_timeout(Duration::from_millis(settings.http.timeout_ms));
                fetch_reference_lists(&client, notifier).await?
            }
            None => ReferenceLists::new(),
        };

        let form = build_form(&settings.preferences, &lists);
        let mut answers = Vec::with_capacity(form.len());
        for entry in &form {
            if let Some(value) = prompt_field(entry)? {
                answers.push((entry.field, value));
            }
        }

        let base_url_changed = apply_answers(&mut settings.preferences, answers);
        settings.save()?;
        println!();
        println!("{}", "✓ Preferences saved".green().bold());

        if !base_url_changed {
            return Ok(());
        }
        println!("{}", "  VersionOne base URL changed, reopening preferences...".dimmed());
        println!();
    }
}

fn prompt_field(entry: &FormField) -> Result<Option<String>> {
    let label = entry.field.label();
    if let Some(hint) = entry.field.hint() {
        println!("{}", format!("  {}", hint).dimmed());
    }

    match entry.field.kind() {
        FieldKind::Text => {
            let mut input = Input::<String>::new().with_prompt(label);
            if let Some(current) = &entry.current {
                input = input.default(current.clone());
            }
            Ok(Some(input.interact_text()?))
        }
        FieldKind::UnsignedInt => {
            let mut input = Input::<String>::new()
                .with_prompt(label)
                .validate_with(|value: &String| -> std::result::Result<(), String> {
                    parse_max_name_length(value).map(|_| ()).map_err(|e| e.to_string())
                });
            if let Some(current) = &entry.current {
                input = input.default(current.clone());
            }
            Ok(Some(input.interact_text()?))
        }
        FieldKind::LongText => {
            let current = entry.current.clone().unwrap_or_default();
            println!("{}", format!("  {}:", label).bold());
            for line in current.lines() {
                println!("    {}", line.dimmed());
            }
            let edit = Confirm::new()
                .with_prompt(format!("Edit {}?", label.to_lowercase()))
                .default(current.is_empty())
                .interact()?;
            if !edit {
                return Ok(Some(current));
            }
            Ok(Some(Editor::new().edit(&current)?.unwrap_or(current)))
        }
        FieldKind::Asset => {
            if entry.options.is_empty() {
                println!(
                    "{}",
                    format!("  No active values for {} in VersionOne", label).yellow()
                );
                return Ok(None);
            }
            let names: Vec<&str> = entry.options.iter().map(|o| o.name.as_str()).collect();
            let choice = Select::new()
                .with_prompt(label)
                .items(&names)
                .default(entry.selected_index().unwrap_or(0))
                .interact()?;
            Ok(Some(entry.options[choice].to_string()))
        }
    }
}
