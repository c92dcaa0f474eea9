// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Interactive B-tree index file manager.
//!
//! Thin REPL driver over [`btidx::IndexManager`] — no tree logic lives here. Commands accept
//! either their full word or their leading menu digit; `q` is also accepted for `quit`.

use std::path::PathBuf;

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::{CompletionType, Config as RlConfig, EditMode, Editor};

use btidx::{extract_csv, load_csv, Config, IndexManager};

fn main() -> Result<()> {
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut current: Option<IndexManager> = match &config.default_index {
        Some(path) => match IndexManager::open(path) {
            Ok(mgr) => {
                println!("Opened default index file: {}", path.display());
                Some(mgr)
            }
            Err(e) => {
                eprintln!("Could not open default index {}: {}", path.display(), e);
                None
            }
        },
        None => None,
    };

    let rl_config = RlConfig::builder()
        .history_ignore_space(true)
        .history_ignore_dups(true)
        .unwrap()
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .build();
    let mut rl = Editor::<(), rustyline::history::FileHistory>::with_config(rl_config)?;

    if rl.load_history(&config.history_file).is_err() {
        // No previous history is not an error worth surfacing.
    }

    loop {
        display_menu();
        match rl.readline("Enter command: ") {
            Ok(line) => {
                rl.add_history_entry(line.as_str()).ok();
                let choice = line.trim().to_lowercase();
                if !dispatch(&choice, &mut current, &mut rl) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Readline error: {}", e);
                break;
            }
        }
    }

    let _ = rl.save_history(&config.history_file);
    Ok(())
}

fn display_menu() {
    println!("\n--- B-Tree Index File Manager ---");
    println!("1. create  - Create a new index file");
    println!("2. open    - Open an existing index file");
    println!("3. insert  - Insert a key/value pair");
    println!("4. search  - Search for a key");
    println!("5. load    - Load key/value pairs from a CSV");
    println!("6. print   - Print all key/value pairs");
    println!("7. extract - Save key/value pairs to a CSV");
    println!("8. quit    - Exit the program");
}

/// Returns `false` when the REPL should exit.
fn dispatch(
    choice: &str,
    current: &mut Option<IndexManager>,
    rl: &mut Editor<(), rustyline::history::FileHistory>,
) -> bool {
    match choice {
        "create" | "1" => cmd_create(current, rl),
        "open" | "2" => cmd_open(current, rl),
        "insert" | "3" => cmd_insert(current, rl),
        "search" | "4" => cmd_search(current, rl),
        "load" | "5" => cmd_load(current, rl),
        "print" | "6" => cmd_print(current),
        "extract" | "7" => cmd_extract(current, rl),
        "quit" | "8" | "q" => {
            println!("Exiting B-Tree Index Manager. Goodbye!");
            return false;
        }
        "" => {}
        _ => println!("Invalid command. Please try again."),
    }
    true
}

fn read_line(rl: &mut Editor<(), rustyline::history::FileHistory>, prompt: &str) -> Option<String> {
    match rl.readline(prompt) {
        Ok(line) => Some(line.trim().to_string()),
        Err(_) => None,
    }
}

fn confirm_overwrite(rl: &mut Editor<(), rustyline::history::FileHistory>, path: &PathBuf) -> bool {
    if !path.exists() {
        return true;
    }
    let answer = read_line(
        rl,
        &format!("File {} already exists. Overwrite? (yes/no): ", path.display()),
    )
    .unwrap_or_default();
    if answer.to_lowercase() != "yes" {
        println!("Operation cancelled.");
        return false;
    }
    true
}

fn cmd_create(current: &mut Option<IndexManager>, rl: &mut Editor<(), rustyline::history::FileHistory>) {
    let Some(filename) = read_line(rl, "Enter filename for new index file: ") else {
        return;
    };
    let path = PathBuf::from(filename);
    let overwrite = path.exists();

    if overwrite && !confirm_overwrite(rl, &path) {
        return;
    }

    match IndexManager::create(&path, overwrite) {
        Ok(mgr) => {
            println!("Created and opened index file: {}", path.display());
            *current = Some(mgr);
        }
        Err(e) => println!("Failed to create index file: {}", e),
    }
}

fn cmd_open(current: &mut Option<IndexManager>, rl: &mut Editor<(), rustyline::history::FileHistory>) {
    let Some(filename) = read_line(rl, "Enter filename of index file to open: ") else {
        return;
    };

    match IndexManager::open(&filename) {
        Ok(mgr) => {
            println!("Opened index file: {}", filename);
            *current = Some(mgr);
        }
        Err(e) => println!("Failed to open index file: {}", e),
    }
}

fn cmd_insert(current: &mut Option<IndexManager>, rl: &mut Editor<(), rustyline::history::FileHistory>) {
    let Some(mgr) = current.as_mut() else {
        println!("Error: No index file is currently open.");
        return;
    };

    let Some(key) = read_line(rl, "Enter key (unsigned integer): ").and_then(|s| s.parse::<u64>().ok())
    else {
        println!("Error: Please enter valid unsigned integers.");
        return;
    };
    let Some(value) =
        read_line(rl, "Enter value (unsigned integer): ").and_then(|s| s.parse::<u64>().ok())
    else {
        println!("Error: Please enter valid unsigned integers.");
        return;
    };

    match mgr.insert(key, value) {
        Ok(()) => println!("Inserted key {} with value {}", key, value),
        Err(e) => println!("Failed to insert key/value pair: {}", e),
    }
}

fn cmd_search(current: &mut Option<IndexManager>, rl: &mut Editor<(), rustyline::history::FileHistory>) {
    let Some(mgr) = current.as_mut() else {
        println!("Error: No index file is currently open.");
        return;
    };

    let Some(key) =
        read_line(rl, "Enter key to search (unsigned integer): ").and_then(|s| s.parse::<u64>().ok())
    else {
        println!("Error: Please enter a valid unsigned integer.");
        return;
    };

    match mgr.search(key) {
        Ok(Some(value)) => println!("Key {} found. Value: {}", key, value),
        Ok(None) => println!("Key {} not found.", key),
        Err(e) => println!("Error searching: {}", e),
    }
}

fn cmd_load(current: &mut Option<IndexManager>, rl: &mut Editor<(), rustyline::history::FileHistory>) {
    let Some(mgr) = current.as_mut() else {
        println!("Error: No index file is currently open.");
        return;
    };
    let Some(filename) = read_line(rl, "Enter CSV filename to load: ") else {
        return;
    };

    match load_csv(mgr, &filename) {
        Ok((success, errors)) => {
            println!("Load complete. Successful insertions: {}, Errors: {}", success, errors)
        }
        Err(e) => println!("Error loading CSV: {}", e),
    }
}

fn cmd_print(current: &mut Option<IndexManager>) {
    let Some(mgr) = current.as_mut() else {
        println!("Error: No index file is currently open.");
        return;
    };

    match mgr.traverse() {
        Ok(entries) if entries.is_empty() => println!("No entries in the index."),
        Ok(entries) => {
            println!("Current Index Entries:");
            for (key, value) in entries {
                println!("Key: {}, Value: {}", key, value);
            }
        }
        Err(e) => println!("Error retrieving entries: {}", e),
    }
}

fn cmd_extract(current: &mut Option<IndexManager>, rl: &mut Editor<(), rustyline::history::FileHistory>) {
    let Some(mgr) = current.as_mut() else {
        println!("Error: No index file is currently open.");
        return;
    };
    let Some(filename) = read_line(rl, "Enter CSV filename to extract entries: ") else {
        return;
    };
    let path = PathBuf::from(&filename);

    if path.exists() && !confirm_overwrite(rl, &path) {
        return;
    }

    match extract_csv(mgr, &path) {
        Ok(_) => println!("Entries extracted to {}", filename),
        Err(e) => println!("Error extracting to CSV: {}", e),
    }
}
