//! gptbpe: encode, decode and segment text with the r50k, p50k and cl100k vocabularies.

use std::io::Write;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;

use gptbpe::cli;
use gptbpe::{Codec, Vocabulary};

#[derive(Parser)]
#[command(name = "gptbpe", about = "Byte-level BPE tokenizer for r50k, p50k and cl100k")]
struct Args {
    /// Directory holding <name>_base.tiktoken rank files
    #[arg(long, env = "GPTBPE_VOCAB_DIR", global = true)]
    vocab_dir: Option<PathBuf>,

    /// Suppress all logging
    #[arg(long, global = true)]
    log_disable: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct InputArgs {
    /// Text to process
    #[arg(short = 'p', long, conflicts_with_all = ["file", "stdin"])]
    prompt: Option<String>,

    /// Read input bytes from file
    #[arg(short = 'f', long, conflicts_with = "stdin")]
    file: Option<PathBuf>,

    /// Read input bytes from stdin
    #[arg(long)]
    stdin: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Encode input to token ids
    Encode {
        /// Vocabulary: r50k, p50k or cl100k
        #[arg(long, value_parser = parse_vocab)]
        vocab: Vocabulary,

        #[command(flatten)]
        input: InputArgs,

        /// Emit special token ids for special token text
        #[arg(long)]
        special: bool,

        /// Output only token IDs in list format: [1, 2, 3]
        #[arg(long)]
        ids: bool,

        /// Output format: text or json
        #[arg(long, default_value = "text", value_parser = validate_output_format)]
        output_format: String,
    },
    /// Decode token ids to bytes on stdout
    Decode {
        /// Vocabulary: r50k, p50k or cl100k
        #[arg(long, value_parser = parse_vocab)]
        vocab: Vocabulary,

        /// Token ids; read from stdin when omitted
        ids: Vec<u32>,
    },
    /// Print one grapheme boundary class (0-3) per input byte
    Grapheme {
        #[command(flatten)]
        input: InputArgs,
    },
}

fn parse_vocab(s: &str) -> Result<Vocabulary, String> {
    s.parse::<Vocabulary>().map_err(|e| e.to_string())
}

fn validate_output_format(s: &str) -> Result<String, String> {
    match s {
        "text" | "json" => Ok(s.to_string()),
        _ => Err(format!("Unknown output format '{}'. Options: text, json", s)),
    }
}

#[derive(Serialize)]
struct TokenEntry {
    id: u32,
    text: String,
}

#[derive(Serialize)]
struct JsonOutput {
    vocab: &'static str,
    tokens: Vec<TokenEntry>,
    count: usize,
}

fn main() {
    let args = Args::parse();
    cli::init_logging(args.log_disable);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_codec(vocab_dir: Option<PathBuf>) -> Result<Codec, Box<dyn std::error::Error>> {
    let dir = vocab_dir.ok_or("No vocabulary directory. Use --vocab-dir or GPTBPE_VOCAB_DIR")?;
    Ok(Codec::from_dir(dir)?)
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        Command::Encode {
            vocab,
            input,
            special,
            ids,
            output_format,
        } => {
            let codec = load_codec(args.vocab_dir)?;
            let bytes =
                cli::read_input(input.prompt.as_deref(), input.file.as_deref(), input.stdin)?;
            let tokenizer = codec.tokenizer(vocab)?;
            let token_ids = if special {
                tokenizer.encode_with_special(&bytes)?
            } else {
                tokenizer.encode(&bytes)?
            };

            match output_format.as_str() {
                "json" => {
                    let tokens = token_ids
                        .iter()
                        .map(|&id| {
                            Ok(TokenEntry {
                                id,
                                text: tokenizer.decode_lossy(&[id])?,
                            })
                        })
                        .collect::<Result<Vec<_>, gptbpe::TokenizerError>>()?;
                    let output = JsonOutput {
                        vocab: vocab.name(),
                        count: tokens.len(),
                        tokens,
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                _ if ids => {
                    let id_strs: Vec<String> = token_ids.iter().map(|id| id.to_string()).collect();
                    println!("[{}]", id_strs.join(", "));
                }
                _ => {
                    for &id in &token_ids {
                        println!("{:>6} -> {:?}", id, tokenizer.decode_lossy(&[id])?);
                    }
                    println!("Total number of tokens: {}", token_ids.len());
                }
            }
        }
        Command::Decode { vocab, ids } => {
            let codec = load_codec(args.vocab_dir)?;
            let ids = if ids.is_empty() {
                let raw = cli::read_input(None, None, true)?;
                cli::parse_ids(&String::from_utf8_lossy(&raw))?
            } else {
                ids
            };
            let bytes = codec.decode(&ids, vocab)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
        Command::Grapheme { input } => {
            let bytes =
                cli::read_input(input.prompt.as_deref(), input.file.as_deref(), input.stdin)?;
            println!("{}", cli::format_labels(&gptbpe::grapheme(&bytes)));
        }
    }

    Ok(())
}
