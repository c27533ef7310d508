use inquire::{Confirm, Text};

use super::credentials::load_credentials;
use super::http_client::ApiClient;
use super::pickers::{confirm_action, pick_category, pick_page, print_warnings};
use crate::dashboard::{FormMode, PageDraft, PageForm, PageGroup, UNCATEGORIZED, Viewer};
use crate::server::dto::MeResponse;
use crate::types::{Category, Page, PageWithCategory};

fn logged_in_client() -> anyhow::Result<ApiClient> {
    ApiClient::from_credentials(&load_credentials()?)
}

fn fetch_pages(client: &ApiClient) -> anyhow::Result<Vec<PageWithCategory>> {
    client.get_query("/pages", &[("grouped", "false")])
}

fn find_or_pick_page(
    client: &ApiClient,
    page_id: Option<String>,
    message: &str,
    non_interactive: bool,
) -> anyhow::Result<Option<PageWithCategory>> {
    let pages = fetch_pages(client)?;

    if let Some(id) = page_id {
        return pages
            .into_iter()
            .find(|p| p.page.id == id)
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("Page not found: {id}"));
    }
    if non_interactive {
        anyhow::bail!("--page-id is required in non-interactive mode");
    }
    pick_page(message, pages)
}

/// Prompts for a text field, starting from its current value.
fn prompt_field(label: &str, current: &str) -> anyhow::Result<String> {
    Ok(Text::new(label).with_initial_value(current).prompt()?)
}

/// Runs the form until it validates or the user gives up on a field.
fn fill_form(
    form: &mut PageForm,
    categories: Vec<Category>,
    ask_common: Option<bool>,
    non_interactive: bool,
) -> anyhow::Result<(FormMode, PageDraft)> {
    if !non_interactive {
        let draft = form
            .draft_mut()
            .ok_or_else(|| anyhow::anyhow!("form is not open"))?;

        draft.title = prompt_field("Title:", &draft.title)?;
        draft.url = prompt_field("URL:", &draft.url)?;
        let description = prompt_field("Description (optional):", draft.description.as_deref().unwrap_or(""))?;
        draft.description = Some(description);

        if let Some(category) = pick_category("Category:", categories)? {
            draft.category_id = Some(category.id);
        }

        if let Some(default) = ask_common {
            draft.is_common = Confirm::new("Show this page to everyone (common)?")
                .with_default(default)
                .prompt()?;
        }
    }

    match form.submit() {
        Some(submitted) => Ok(submitted),
        None => anyhow::bail!(form.error().unwrap_or("invalid page").to_string()),
    }
}

pub fn run_page_list(category: Option<String>, server: Option<String>, json: bool) -> anyhow::Result<()> {
    let client = ApiClient::connect(server.as_deref())?;

    let mut query = vec![("grouped", "true".to_string())];
    if let Some(category) = category {
        query.push(("category", category));
    }
    let groups: Vec<PageGroup> = client.get_query("/pages", &query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    if groups.is_empty() {
        println!("No pages found.");
        return Ok(());
    }

    for group in groups {
        println!();
        println!("{}", group.category);
        for page in group.pages {
            let marker = if page.page.is_common { ' ' } else { '*' };
            println!("  {marker} {}  {}", page.page.title, page.page.url);
            if let Some(description) = &page.page.description {
                println!("      {description}");
            }
        }
    }
    println!();
    println!("(* private page, groups without a category are listed as \"{UNCATEGORIZED}\")");

    Ok(())
}

pub fn run_page_add(
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    category: Option<String>,
    common: bool,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let client = logged_in_client()?;
    let me: MeResponse = client.get("/auth/me")?;
    if me.viewer == Viewer::Anonymous {
        anyhow::bail!("Your session has expired. Run 'devmarks auth login' again.");
    }

    let mut form = PageForm::open_create(&me.viewer);
    if let Some(draft) = form.draft_mut() {
        draft.title = title.unwrap_or_default();
        draft.url = url.unwrap_or_default();
        draft.description = description;
        draft.category_id = category.clone();
        draft.is_common = common || (!non_interactive && draft.is_common);
    }

    let categories = if non_interactive || category.is_some() {
        Vec::new()
    } else {
        client.get("/categories")?
    };
    let ask_common = (me.viewer.is_admin() && !common).then_some(true);
    let (_, draft) = fill_form(&mut form, categories, ask_common, non_interactive)?;

    let result = client.post::<Page, _>("/pages", &draft);
    form.complete(&result);
    let reply = result?;

    println!();
    println!("Added page '{}' ({})", reply.data.title, reply.data.id);
    if draft.is_common && !reply.data.is_common {
        println!("Only administrators can add common pages; it was saved as private.");
    }
    print_warnings(&reply.warnings);
    println!();

    Ok(())
}

pub fn run_page_edit(
    page_id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    category: Option<String>,
    common: Option<bool>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let client = logged_in_client()?;
    let Some(existing) = find_or_pick_page(&client, page_id, "Select page to edit:", non_interactive)? else {
        println!("No pages found.");
        return Ok(());
    };

    let me: MeResponse = client.get("/auth/me")?;

    let mut form = PageForm::open_edit(&existing.page);
    if let Some(draft) = form.draft_mut() {
        if let Some(title) = title {
            draft.title = title;
        }
        if let Some(url) = url {
            draft.url = url;
        }
        if description.is_some() {
            draft.description = description;
        }
        if let Some(category) = category.clone() {
            draft.category_id = Some(category);
        }
        if let Some(common) = common {
            draft.is_common = common;
        }
    }

    let categories = if non_interactive || category.is_some() {
        Vec::new()
    } else {
        client.get("/categories")?
    };
    let ask_common = (me.viewer.is_admin() && common.is_none()).then_some(existing.page.is_common);
    let (mode, draft) = fill_form(&mut form, categories, ask_common, non_interactive)?;

    let FormMode::Edit { page_id } = mode else {
        anyhow::bail!("form was not opened for editing");
    };

    let result = client.patch::<Page, _>(&format!("/pages/{page_id}"), &draft);
    form.complete(&result);
    let reply = result?;

    println!();
    println!("Updated page '{}'", reply.data.title);
    print_warnings(&reply.warnings);
    println!();

    Ok(())
}

pub fn run_page_delete(page_id: Option<String>, non_interactive: bool, yes: bool) -> anyhow::Result<()> {
    let client = logged_in_client()?;
    let Some(page) = find_or_pick_page(&client, page_id, "Select page to delete:", non_interactive)? else {
        println!("No pages found.");
        return Ok(());
    };

    let confirmed = confirm_action(
        &format!("Delete page '{}'?", page.page.title),
        yes,
        non_interactive,
    )?;

    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    client.delete(&format!("/pages/{}", page.page.id))?;

    println!();
    println!("Deleted page '{}'", page.page.title);
    println!();

    Ok(())
}
