use std::path::PathBuf;

use clap::{Parser, Subcommand};
use coursefind::Result;
use coursefind::commands::{
    add_feedback, delete_namespace, ingest_chunks, search, show_config, show_stats, vector_search,
};

#[derive(Parser)]
#[command(name = "coursefind")]
#[command(about = "Hybrid lexical and vector retrieval over course material")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest pre-embedded chunks from a JSON file into a namespace
    Ingest {
        /// Namespace (course) to ingest into
        namespace: String,
        /// JSON file holding an array of chunk objects with embeddings
        file: PathBuf,
    },
    /// Hybrid keyword + vector search within a namespace
    Search {
        /// Namespace to search
        namespace: String,
        /// Query text for the keyword channel
        query: String,
        /// JSON file holding the query embedding as a flat array of floats
        #[arg(long)]
        embedding: PathBuf,
        /// Number of results to return
        #[arg(long, default_value_t = 5)]
        top_k: usize,
        /// Override the configured keyword channel weight
        #[arg(long)]
        lexical_weight: Option<f32>,
        /// Override the configured vector channel weight
        #[arg(long)]
        vector_weight: Option<f32>,
    },
    /// Pure vector similarity search, no keyword fusion
    VectorSearch {
        /// Namespace to search
        namespace: String,
        /// JSON file holding the query embedding as a flat array of floats
        #[arg(long)]
        embedding: PathBuf,
        /// Number of results to return
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Record an instructor correction as retrievable context
    Feedback {
        /// Namespace the correction belongs to
        namespace: String,
        /// The student question that was answered incorrectly
        question: String,
        /// The instructor's corrected answer
        answer: String,
        /// JSON file holding the embedding of the question/answer pair
        #[arg(long)]
        embedding: PathBuf,
    },
    /// Show aggregate counts for a namespace
    Stats {
        /// Namespace to inspect
        namespace: String,
    },
    /// Delete a namespace and all of its chunks
    Delete {
        /// Namespace to delete
        namespace: String,
    },
    /// Show the active configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { namespace, file } => {
            ingest_chunks(&namespace, &file).await?;
        }
        Commands::Search {
            namespace,
            query,
            embedding,
            top_k,
            lexical_weight,
            vector_weight,
        } => {
            search(
                &namespace,
                &query,
                &embedding,
                top_k,
                lexical_weight,
                vector_weight,
            )
            .await?;
        }
        Commands::VectorSearch {
            namespace,
            embedding,
            top_k,
        } => {
            vector_search(&namespace, &embedding, top_k).await?;
        }
        Commands::Feedback {
            namespace,
            question,
            answer,
            embedding,
        } => {
            add_feedback(&namespace, &question, &answer, &embedding).await?;
        }
        Commands::Stats { namespace } => {
            show_stats(&namespace).await?;
        }
        Commands::Delete { namespace } => {
            delete_namespace(&namespace).await?;
        }
        Commands::Config => {
            show_config()?;
        }
    }

    Ok(())
}
