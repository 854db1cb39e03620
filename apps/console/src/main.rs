use std::{
    io::{self, BufRead, Write},
    sync::Arc,
};

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use client_core::{
    ConfirmationService, EditorMode, EntityEditor, EntityService, HttpEntityService, Navigator,
    NotificationService, Route,
};
use shared::domain::Vehicle;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    server_url: String,
    /// Route parameter: a numeric id edits that vehicle, "0" is reserved,
    /// anything else starts a new one.
    #[arg(long, default_value = "new")]
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    kind: Option<String>,
}

/// Asks the yes/no question on the terminal; anything but "y"/"yes" declines.
struct TerminalConfirmation;

#[async_trait]
impl ConfirmationService for TerminalConfirmation {
    async fn confirm(&self, prompt: Option<&str>) -> bool {
        let question = prompt
            .unwrap_or("You have unsaved changes. Leave anyway?")
            .to_string();
        tokio::task::spawn_blocking(move || {
            print!("{question} [y/N] ");
            let _ = io::stdout().flush();
            let mut answer = String::new();
            if io::stdin().lock().read_line(&mut answer).is_err() {
                return false;
            }
            matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}

struct TerminalNotifications;

impl NotificationService for TerminalNotifications {
    fn notify(&self, message: &str) {
        eprintln!("* {message}");
    }
}

struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn go_to(&self, route: Route) {
        match route {
            Route::EntityList { selected: Some(id) } => {
                println!("-> vehicles (selected {})", id.0);
            }
            Route::EntityList { selected: None } => println!("-> vehicles"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let service = Arc::new(HttpEntityService::<Vehicle>::new(
        args.server_url,
        "vehicles",
    ));
    let editor = EntityEditor::new(
        Arc::clone(&service) as Arc<dyn EntityService<Vehicle>>,
        Arc::new(TerminalConfirmation),
        Arc::new(TerminalNotifications),
        Arc::new(TerminalNavigator),
    );

    editor.activate().await;
    editor
        .initialize(EditorMode::from_route_param(&args.id))
        .await;

    let Some(loaded) = editor.draft().await else {
        editor.deactivate().await;
        return Ok(());
    };
    println!("Editing: {loaded:?}");

    editor
        .update_draft(|draft| {
            if let Some(name) = args.name {
                draft.name = name;
            }
            if let Some(kind) = args.kind {
                draft.kind = kind;
            }
        })
        .await;

    if editor.is_dirty().await {
        editor.save().await;
    } else {
        println!("Nothing changed; skipping save.");
    }

    if let Some(current) = editor.canonical().await {
        println!("Current state: {current:?}");
    }

    editor.deactivate().await;
    Ok(())
}
