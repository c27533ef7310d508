use inquire::Text;
use serde::Serialize;

use super::credentials::load_credentials;
use super::http_client::ApiClient;
use super::pickers::{confirm_action, pick_category, print_warnings};
use crate::dashboard::validate_category_name;
use crate::types::Category;

#[derive(Serialize)]
struct CategoryRequest<'a> {
    name: &'a str,
}

fn category_name(name: Option<String>, prompt: &str, non_interactive: bool) -> anyhow::Result<String> {
    let name = if let Some(n) = name {
        n
    } else if non_interactive {
        anyhow::bail!("--name is required in non-interactive mode");
    } else {
        Text::new(prompt)
            .with_validator(|input: &str| {
                Ok(validate_category_name(input)
                    .map(|_| inquire::validator::Validation::Valid)
                    .unwrap_or_else(|e| inquire::validator::Validation::Invalid(e.to_string().into())))
            })
            .prompt()?
    };

    Ok(validate_category_name(&name)?)
}

fn find_or_pick_category(
    client: &ApiClient,
    category_id: Option<String>,
    message: &str,
    non_interactive: bool,
) -> anyhow::Result<Option<Category>> {
    let categories: Vec<Category> = client.get("/categories")?;

    if let Some(id) = category_id {
        return categories
            .into_iter()
            .find(|c| c.id == id)
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("Category not found: {id}"));
    }
    if non_interactive {
        anyhow::bail!("--category-id is required in non-interactive mode");
    }
    pick_category(message, categories)
}

pub fn run_category_list(server: Option<String>, json: bool) -> anyhow::Result<()> {
    let client = ApiClient::connect(server.as_deref())?;
    let categories: Vec<Category> = client.get("/categories")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
        return Ok(());
    }

    if categories.is_empty() {
        println!("No categories found.");
        return Ok(());
    }

    println!();
    for category in categories {
        println!("  {}  {}", category.id, category.name);
    }
    println!();

    Ok(())
}

pub fn run_category_add(name: Option<String>, non_interactive: bool) -> anyhow::Result<()> {
    let client = ApiClient::from_credentials(&load_credentials()?)?;
    let name = category_name(name, "Category name:", non_interactive)?;

    let reply = client.post::<Category, _>("/categories", &CategoryRequest { name: &name })?;

    println!();
    println!("Created category '{}' ({})", reply.data.name, reply.data.id);
    print_warnings(&reply.warnings);
    println!();

    Ok(())
}

pub fn run_category_rename(
    category_id: Option<String>,
    name: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let client = ApiClient::from_credentials(&load_credentials()?)?;
    let Some(category) =
        find_or_pick_category(&client, category_id, "Select category to rename:", non_interactive)?
    else {
        println!("No category selected.");
        return Ok(());
    };

    let name = category_name(name, "New name:", non_interactive)?;
    let reply = client.patch::<Category, _>(
        &format!("/categories/{}", category.id),
        &CategoryRequest { name: &name },
    )?;

    println!();
    println!("Renamed category '{}' to '{}'", category.name, reply.data.name);
    println!();

    Ok(())
}

pub fn run_category_delete(
    category_id: Option<String>,
    non_interactive: bool,
    yes: bool,
) -> anyhow::Result<()> {
    let client = ApiClient::from_credentials(&load_credentials()?)?;
    let Some(category) =
        find_or_pick_category(&client, category_id, "Select category to delete:", non_interactive)?
    else {
        println!("No category selected.");
        return Ok(());
    };

    let confirmed = confirm_action(
        &format!("Delete category '{}'?", category.name),
        yes,
        non_interactive,
    )?;

    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    client.delete(&format!("/categories/{}", category.id))?;

    println!();
    println!("Deleted category '{}'", category.name);
    println!();

    Ok(())
}
