use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use rfp_analysis_core::stores::azure_openai::{
    DEFAULT_CHAT_DEPLOYMENT, DEFAULT_EMBEDDING_DEPLOYMENT, DEFAULT_OPENAI_API_VERSION,
};
use rfp_analysis_core::stores::azure_search::DEFAULT_INDEX_NAME;
use rfp_analysis_core::{
    analyze_and_store, example_question, ingest_folder_best_effort, AnalyzedRfp,
    AzureOpenAiClient, AzureOpenAiConfig, AzureSearchConfig, AzureSearchStore, RfpIndex,
    RfpServices, SearchMatch, Session, StorageOutcome, DEFAULT_TOP_K, EXAMPLE_QUESTIONS,
};
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Services = RfpServices<AzureOpenAiClient, AzureOpenAiClient, AzureSearchStore>;

#[derive(Parser)]
#[command(name = "rfp-analyzer", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Azure AI Search endpoint
    #[arg(long, env = "AZURE_SEARCH_ENDPOINT")]
    search_endpoint: String,

    /// Azure AI Search admin key
    #[arg(long, env = "AZURE_SEARCH_KEY", hide_env_values = true)]
    search_key: String,

    /// Search index name
    #[arg(long, env = "AZURE_SEARCH_INDEX_NAME", default_value = DEFAULT_INDEX_NAME)]
    index_name: String,

    /// Azure OpenAI endpoint
    #[arg(long, env = "AZURE_OPENAI_ENDPOINT")]
    openai_endpoint: String,

    /// Azure OpenAI key
    #[arg(long, env = "AZURE_OPENAI_KEY", hide_env_values = true)]
    openai_key: String,

    #[arg(long, env = "AZURE_OPENAI_API_VERSION", default_value = DEFAULT_OPENAI_API_VERSION)]
    openai_api_version: String,

    /// Chat deployment used for analysis and questions
    #[arg(long, env = "AZURE_OPENAI_CHAT_DEPLOYMENT", default_value = DEFAULT_CHAT_DEPLOYMENT)]
    chat_deployment: String,

    /// Embedding deployment, must produce 1536-dimensional vectors
    #[arg(
        long,
        env = "AZURE_OPENAI_EMBEDDING_DEPLOYMENT",
        default_value = DEFAULT_EMBEDDING_DEPLOYMENT
    )]
    embedding_deployment: String,
}

#[derive(Subcommand)]
enum Command {
    /// Create the search index, or update its schema.
    InitIndex,
    /// Analyze one RFP file and store it in the index.
    Analyze {
        /// PDF, DOCX or TXT file.
        #[arg(long)]
        file: String,
        /// Analyze only, do not embed or upload.
        #[arg(long, default_value_t = false)]
        no_store: bool,
        /// Print the raw analysis JSON instead of the summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Analyze a file (without storing it) and answer a question about it.
    Ask {
        #[arg(long)]
        file: String,
        #[arg(long)]
        question: String,
    },
    /// Find stored RFPs similar to a query.
    Search {
        #[arg(long)]
        query: String,
        /// Number of results to return.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// Analyze and store every supported file under a folder.
    Ingest {
        #[arg(long)]
        folder: String,
    },
    /// Interactive session: analyze, ask and search in one place.
    Shell,
}

impl Cli {
    fn services(&self) -> Services {
        let mut openai = AzureOpenAiConfig::new(&self.openai_endpoint, &self.openai_key);
        openai.api_version = self.openai_api_version.clone();
        openai.chat_deployment = self.chat_deployment.clone();
        openai.embedding_deployment = self.embedding_deployment.clone();

        let mut search = AzureSearchConfig::new(&self.search_endpoint, &self.search_key);
        search.index_name = self.index_name.clone();

        RfpServices::new(
            AzureOpenAiClient::new(openai.clone()),
            AzureOpenAiClient::new(openai),
            AzureSearchStore::new(search),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    if let Err(error) = dotenvy::dotenv() {
        if !error.not_found() {
            warn!(error = %error, "could not load .env file");
        }
    }

    let cli = Cli::parse();
    let services = cli.services();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        index = %cli.index_name,
        "rfp-analyzer boot"
    );

    match &cli.command {
        Command::InitIndex => {
            services.index.ensure_index().await?;
            println!("index {} is ready", cli.index_name);
        }
        Command::Analyze {
            file,
            no_store,
            json,
        } => {
            let analyzed = analyze_and_store(&services, Path::new(file), !no_store)
                .await
                .with_context(|| format!("analyzing {file}"))?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&analyzed.analysis.raw)?);
            } else {
                print_analysis(&analyzed);
            }
        }
        Command::Ask { file, question } => {
            let mut session = Session::new(services);
            session
                .analyze_file(Path::new(file), false)
                .await
                .with_context(|| format!("analyzing {file}"))?;
            let exchange = session.ask(question).await?;
            println!("{}", exchange.answer);
        }
        Command::Search { query, top_k } => {
            let matches = services.similar().search(query, *top_k).await?;
            print_matches(&matches);
        }
        Command::Ingest { folder } => {
            let report = ingest_folder_best_effort(&services, Path::new(folder)).await?;

            if !report.skipped_files.is_empty() {
                warn!(
                    "skipped_files={} for folder={}",
                    report.skipped_files.len(),
                    folder
                );
                for skipped in &report.skipped_files {
                    warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped file");
                }
            }

            for analyzed in &report.analyzed {
                println!(
                    "{} -> {}",
                    analyzed.source.display(),
                    storage_line(&analyzed.storage)
                );
            }
            println!(
                "{} of {} files stored at {}",
                report.stored_count(),
                report.analyzed.len() + report.skipped_files.len(),
                Utc::now().to_rfc3339()
            );
        }
        Command::Shell => run_shell(&cli, Session::new(services)).await?,
    }

    Ok(())
}

async fn run_shell(
    cli: &Cli,
    mut session: Session<AzureOpenAiClient, AzureOpenAiClient, AzureSearchStore>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_shell_help();

    loop {
        print!("rfp> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        let (command, argument) = line
            .split_once(char::is_whitespace)
            .map(|(command, rest)| (command, rest.trim()))
            .unwrap_or((line, ""));

        let outcome = match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                print_shell_help();
                Ok(())
            }
            "analyze" => session
                .analyze_file(Path::new(argument), true)
                .await
                .map(print_analysis),
            "ask" => session
                .ask(argument)
                .await
                .map(|exchange| println!("{}", exchange.answer)),
            "examples" => {
                for (number, question) in EXAMPLE_QUESTIONS.iter().enumerate() {
                    println!("  {}. {question}", number + 1);
                }
                Ok(())
            }
            "example" => match argument.parse().ok().and_then(example_question) {
                Some(question) => {
                    println!("question: {question}");
                    session
                        .ask(question)
                        .await
                        .map(|exchange| println!("{}", exchange.answer))
                }
                None => {
                    println!("usage: example <1-{}>", EXAMPLE_QUESTIONS.len());
                    Ok(())
                }
            },
            "search" => session
                .search_similar(argument, DEFAULT_TOP_K)
                .await
                .map(print_matches),
            "show" => {
                match session.current() {
                    Some(analyzed) => print_analysis(analyzed),
                    None => println!("no rfp analyzed yet"),
                }
                if let Some(exchange) = session.last_answer() {
                    println!("last question: {}\n{}", exchange.question, exchange.answer);
                }
                Ok(())
            }
            "clear" => {
                session.clear_answer();
                Ok(())
            }
            "reset" => {
                session.reinitialize(cli.services());
                println!("session reset");
                Ok(())
            }
            other => {
                println!("unknown command {other:?}, type help");
                Ok(())
            }
        };

        if let Err(error) = outcome {
            eprintln!("error: {error}");
        }
    }

    Ok(())
}

fn print_shell_help() {
    println!("commands:");
    println!("  analyze <path>     analyze and store an RFP file");
    println!("  ask <question>     ask about the current RFP");
    println!("  examples           list example questions");
    println!("  example <n>        ask example question n");
    println!("  search <query>     find similar stored RFPs");
    println!("  show               print the current analysis and last answer");
    println!("  clear              forget the last answer");
    println!("  reset              reconnect services and clear the session");
    println!("  help | quit");
}

fn print_analysis(analyzed: &AnalyzedRfp) {
    let fields = &analyzed.fields;
    let summary = &analyzed.analysis.requirements;

    println!("title: {}", fields.title);
    println!("source: {}", analyzed.source.display());
    for warning in &analyzed.document.warnings {
        println!("warning: {warning}");
    }
    if !fields.project_type.is_empty() {
        println!("project_type: {}", fields.project_type);
    }
    println!("budget_range: {}", fields.budget_range);
    println!("submission_deadline: {}", fields.submission_deadline);
    println!("evaluation:");
    println!("  정량정성배점: {}", fields.evaluation_criteria.scoring);
    println!("  가점감점요건: {}", fields.evaluation_criteria.bonus_and_penalty);
    println!("  탈락필수요건: {}", fields.evaluation_criteria.disqualification);
    println!("requirements:");
    for requirement in &fields.requirements {
        println!("  - {requirement}");
    }
    println!(
        "requirement records: {} ({} with recognized ids, {} ids assigned)",
        summary.total, summary.recognized_ids, summary.synthesized_ids
    );
    if !analyzed.analysis.schema.keywords.is_empty() {
        println!("keywords: {}", analyzed.analysis.schema.keywords.join(", "));
    }
    println!("storage: {}", storage_line(&analyzed.storage));
}

fn print_matches(matches: &[SearchMatch]) {
    if matches.is_empty() {
        println!("no similar rfps found");
        return;
    }

    for (rank, hit) in matches.iter().enumerate() {
        println!("{}. {} score={:.4}", rank + 1, hit.title, hit.score);
        if !hit.project_type.is_empty() {
            println!("   project_type={}", hit.project_type);
        }
        if !hit.created_date.is_empty() {
            println!("   created={}", hit.created_date);
        }
        for requirement in hit.requirement_list().iter().take(3) {
            println!("   - {requirement}");
        }
    }
}

fn storage_line(outcome: &StorageOutcome) -> String {
    match outcome {
        StorageOutcome::Stored { id } => format!("stored as {id}"),
        StorageOutcome::Rejected { id } => format!("rejected by index ({id})"),
        StorageOutcome::Failed(reason) => format!("not stored: {reason}"),
        StorageOutcome::Skipped => "not stored (skipped)".to_string(),
    }
}
