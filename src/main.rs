//! epubtree - dump EPUB chapters as normalized content trees

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use epubtree::{ContentNode, Epub};

#[derive(Parser)]
#[command(name = "epubtree")]
#[command(version, about = "Dump EPUB chapters as normalized JSON content trees", long_about = None)]
#[command(after_help = "EXAMPLES:
    epubtree book.epub                  Print every chapter as JSON
    epubtree book.epub -o book.json     Write JSON to a file
    epubtree book.epub --chapter ch03   Print a single chapter
    epubtree -i book.epub               Show book metadata")]
struct Cli {
    /// Input EPUB file
    #[arg(value_name = "INPUT")]
    input: String,

    /// Write JSON here instead of stdout
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<String>,

    /// Only dump the chapter with this spine id
    #[arg(short, long, value_name = "ID")]
    chapter: Option<String>,

    /// Show book metadata instead of dumping content
    #[arg(short, long)]
    info: bool,

    /// Emit compact JSON
    #[arg(long)]
    compact: bool,
}

#[derive(Serialize)]
struct ChapterDump<'a> {
    id: &'a str,
    content: &'a [ContentNode],
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = if cli.info {
        show_info(&cli.input)
    } else {
        dump(&cli)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn show_info(path: &str) -> Result<(), String> {
    let book = Epub::open(path).map_err(|e| e.to_string())?;

    let meta = book.metadata();
    println!("File: {path}");
    if let Some(ref title) = meta.title {
        println!("Title: {title}");
    }
    if let Some(ref author) = meta.author {
        println!("Author: {author}");
    }
    if let Some(ref publisher) = meta.publisher {
        println!("Publisher: {publisher}");
    }
    if let Some(ref language) = meta.language {
        println!("Language: {language}");
    }
    if let Some(ref identifier) = meta.identifier {
        println!("Identifier: {identifier}");
    }
    println!("Package root: {}", book.package_root());
    println!("Chapters: {}", book.chapters().len());

    Ok(())
}

fn dump(cli: &Cli) -> Result<(), String> {
    let book = Epub::open(&cli.input).map_err(|e| e.to_string())?;

    let chapters: Vec<_> = match &cli.chapter {
        Some(id) => {
            let chapter = book
                .chapter(id)
                .ok_or_else(|| format!("no chapter with id '{id}'"))?;
            vec![chapter]
        }
        None => book.chapters().iter().collect(),
    };

    let dumps: Vec<ChapterDump<'_>> = chapters
        .into_iter()
        .map(|c| ChapterDump {
            id: c.id(),
            content: c.content(),
        })
        .collect();

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(|e| e.to_string())?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    if cli.compact {
        serde_json::to_writer(&mut out, &dumps).map_err(|e| e.to_string())?;
    } else {
        serde_json::to_writer_pretty(&mut out, &dumps).map_err(|e| e.to_string())?;
    }
    writeln!(out).map_err(|e| e.to_string())?;
    out.flush().map_err(|e| e.to_string())
}
