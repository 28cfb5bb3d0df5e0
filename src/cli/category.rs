//! Category, rule and categorization CLI commands

use std::collections::HashSet;

use clap::Subcommand;

use crate::config::settings::Settings;
use crate::display::{
    format_analysis, format_category_list, format_rule_list, format_suggestions, DisplayStyle,
};
use crate::error::{ForecastError, ForecastResult};
use crate::models::{Category, CategoryRule, RuleField, RuleOperator};
use crate::services::categorize::{analyze_uncategorized, learn_rules};
use crate::services::RuleCache;
use crate::storage::Storage;

use super::{category_names, parse_money, resolve_category};

/// Category subcommands
#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Create a new category
    Add {
        /// Category name
        name: String,
        /// Parent category name
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// List categories
    List,
}

/// Categorization rule subcommands
#[derive(Subcommand)]
pub enum RuleCommands {
    /// Add a rule assigning a category
    Add {
        /// Category name
        category: String,
        /// Field to inspect (description, amount)
        #[arg(short, long, default_value = "description")]
        field: String,
        /// Comparison (contains, equals, starts-with, ends-with, greater-than, less-than)
        #[arg(short, long, default_value = "contains")]
        operator: String,
        /// Value to compare against
        value: String,
        /// Evaluation order; lower runs first
        #[arg(short, long, default_value = "10")]
        priority: i32,
    },
    /// List rules in evaluation order
    List,
}

/// Categorization helpers
#[derive(Subcommand)]
pub enum CategorizeCommands {
    /// Suggest categories for a description
    Suggest {
        /// Transaction description
        description: String,
        /// Transaction amount
        #[arg(short, long, default_value = "0")]
        amount: String,
        /// Maximum number of suggestions
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Learn rules from a description the user categorized
    Learn {
        /// Category name
        category: String,
        /// Transaction description
        description: String,
        /// Transaction amount
        #[arg(short, long, default_value = "0")]
        amount: String,
    },
    /// Find repeated descriptions among uncategorized transactions
    Analyze,
}

/// Handle a category command
pub fn handle_category_command(
    storage: &Storage,
    settings: &Settings,
    cmd: CategoryCommands,
) -> ForecastResult<()> {
    match cmd {
        CategoryCommands::Add { name, parent } => {
            if resolve_category(storage, settings.user_id, &name).is_ok() {
                return Err(ForecastError::Validation(format!(
                    "A category named '{}' already exists",
                    name
                )));
            }

            let mut category = Category::new(settings.user_id, &name);
            if let Some(parent) = parent {
                category = category.with_parent(resolve_category(storage, settings.user_id, &parent)?.id);
            }
            storage.categories.upsert(category.clone())?;
            storage.categories.save()?;
            println!("Created category: {}", category.name);
        }

        CategoryCommands::List => {
            let categories = storage.categories.get_by_user(settings.user_id)?;
            print!("{}", format_category_list(&categories));
        }
    }

    Ok(())
}

/// Handle a rule command
pub fn handle_rule_command(
    storage: &Storage,
    settings: &Settings,
    rules: &RuleCache,
    cmd: RuleCommands,
) -> ForecastResult<()> {
    match cmd {
        RuleCommands::Add {
            category,
            field,
            operator,
            value,
            priority,
        } => {
            let category = resolve_category(storage, settings.user_id, &category)?;
            let field = RuleField::parse(&field).ok_or_else(|| {
                ForecastError::Validation(format!(
                    "Invalid rule field: '{}'. Valid fields: description, amount",
                    field
                ))
            })?;
            let operator = RuleOperator::parse(&operator).ok_or_else(|| {
                ForecastError::Validation(format!(
                    "Invalid rule operator: '{}'. Valid operators: contains, equals, starts-with, ends-with, greater-than, less-than",
                    operator
                ))
            })?;
            if field == RuleField::Amount {
                parse_money(&value)?;
            } else if operator.is_numeric() {
                return Err(ForecastError::Validation(format!(
                    "Operator '{}' only applies to amounts",
                    operator
                )));
            }

            let rule = CategoryRule::new(category.id, field, operator, value, priority);
            let added = storage.categories.add_rules(vec![rule.clone()])?;
            storage.categories.save()?;
            rules.invalidate(settings.user_id)?;

            if added == 0 {
                println!("An identical rule already exists for {}", category.name);
            } else {
                println!("Added rule for {}: {}", category.name, rule);
            }
        }

        RuleCommands::List => {
            let names = category_names(storage, settings.user_id)?;
            let list = storage.categories.rules_for_user(settings.user_id)?;
            print!("{}", format_rule_list(&list, &names));
        }
    }

    Ok(())
}

/// Handle a categorize command
pub fn handle_categorize_command(
    storage: &Storage,
    settings: &Settings,
    rules: &RuleCache,
    cmd: CategorizeCommands,
) -> ForecastResult<()> {
    match cmd {
        CategorizeCommands::Suggest {
            description,
            amount,
            limit,
        } => {
            let amount = parse_money(&amount)?.abs();
            let matcher = rules.matcher_for(&storage.categories, settings.user_id)?;
            let categories = storage.categories.get_by_user(settings.user_id)?;
            let suggestions = matcher.suggest(
                &categories,
                &description,
                amount,
                limit.unwrap_or(settings.suggestion_limit),
            );
            let names = category_names(storage, settings.user_id)?;
            print!("{}", format_suggestions(&suggestions, &names));
        }

        CategorizeCommands::Learn {
            category,
            description,
            amount,
        } => {
            let category = resolve_category(storage, settings.user_id, &category)?;
            let amount = parse_money(&amount)?.abs();
            let existing = storage.categories.rules_for_user(settings.user_id)?;

            let learned = learn_rules(&existing, category.id, &description, amount);
            let added = storage.categories.add_rules(learned.clone())?;
            storage.categories.save()?;
            rules.invalidate(settings.user_id)?;

            println!("Learned {} rule(s) for {}", added, category.name);
            for rule in &learned {
                println!("  {}", rule);
            }
        }

        CategorizeCommands::Analyze => {
            let accounts: HashSet<_> = storage
                .accounts
                .get_by_user(settings.user_id)?
                .into_iter()
                .map(|a| a.id)
                .collect();
            let transactions: Vec<_> = storage
                .transactions
                .get_all()?
                .into_iter()
                .filter(|t| accounts.contains(&t.account_id))
                .collect();

            let analysis = analyze_uncategorized(&transactions);
            print!(
                "{}",
                format_analysis(&analysis, &DisplayStyle::from_settings(settings))
            );
        }
    }

    Ok(())
}
