use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use rec_entities::entities::{
    attribute_value_function, attribute_value_predicate, project, type_predicate,
};
use rec_entities::{Attribute, Entity, Interaction, Shape, Vocabulary, VocabularyConfig};

#[derive(Debug, Parser)]
#[command(name = "rec-entities", version, about = "Inspect entity data through the typed entity model")]
struct Cli {
    /// JSON vocabulary declaring extra entity types and attributes
    #[arg(long, global = true, env = "REC_ENTITIES_VOCAB")]
    vocab: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a delimited file (header row = attribute names) and summarize it
    Summarize {
        file: PathBuf,

        /// Field delimiter
        #[arg(long, default_value_t = ',', env = "REC_ENTITIES_DELIMITER")]
        delimiter: char,

        /// Entity type of every row
        #[arg(long, default_value = "rating")]
        entity_type: String,

        /// Only summarize rows of this user
        #[arg(long)]
        user: Option<i64>,
    },

    /// List the declared entity types and attributes
    Vocab,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let vocab = load_vocabulary(cli.vocab.as_deref())?;

    match cli.command {
        Command::Summarize {
            file,
            delimiter,
            entity_type,
            user,
        } => run_summarize(&vocab, &file, delimiter, &entity_type, user),
        Command::Vocab => {
            run_vocab(&vocab);
            Ok(())
        }
    }
}

fn load_vocabulary(path: Option<&Path>) -> Result<Vocabulary> {
    let Some(path) = path else {
        return Ok(Vocabulary::new());
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read vocabulary: {}", path.display()))?;
    let config = VocabularyConfig::from_json_str(&text)?;
    let vocab = Vocabulary::from_config(&config)
        .with_context(|| format!("Invalid vocabulary: {}", path.display()))?;
    info!(
        entity_types = config.entity_types.len(),
        attributes = config.attributes.len(),
        "loaded vocabulary"
    );
    Ok(vocab)
}

/// Turn delimited rows into entities through the untyped load path.
///
/// An `id` column supplies the entity id (row number otherwise); empty cells
/// are left unset.
fn load_entities<R: io::Read>(
    mut reader: csv::Reader<R>,
    vocab: &Vocabulary,
    entity_type: &str,
) -> Result<Vec<Entity>> {
    let entity_type = vocab.entity_type(entity_type);
    let headers = reader.headers().context("Failed to read header row")?.clone();

    let mut entities = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let line = row + 2;
        let record = record.with_context(|| format!("Failed to read line {}", line))?;

        let mut builder = rec_entities::entities::new_builder(entity_type.clone());
        builder.set_id(row as i64 + 1);

        for (header, cell) in headers.iter().zip(record.iter()) {
            if cell.trim().is_empty() {
                continue;
            }
            if header == "id" {
                let id = cell
                    .trim()
                    .parse::<i64>()
                    .with_context(|| format!("Line {}: invalid id {:?}", line, cell))?;
                builder.set_id(id);
                continue;
            }
            builder
                .set_untyped_text(vocab, header, cell)
                .with_context(|| format!("Line {}: column '{}'", line, header))?;
        }

        entities.push(builder.build()?);
    }

    debug!(rows = entities.len(), "loaded entities");
    Ok(entities)
}

#[derive(Debug, Default, PartialEq)]
struct Summary {
    entities: usize,
    matching_type: usize,
    shapes: [usize; 4],
    rated: usize,
    mean_rating: Option<f64>,
    min_rating: Option<f64>,
    max_rating: Option<f64>,
    users: usize,
    items: usize,
}

fn summarize(vocab: &Vocabulary, entities: &[Entity], entity_type: &str) -> Summary {
    let common = vocab.common();
    let of_type = type_predicate(vocab.entity_type(entity_type));
    let rating_of = attribute_value_function(&Attribute::new(common.rating.clone()));

    let mut summary = Summary {
        entities: entities.len(),
        ..Summary::default()
    };

    let mut ratings = Vec::new();
    let mut users = BTreeSet::new();
    let mut items = BTreeSet::new();

    for e in entities {
        if of_type(e) {
            summary.matching_type += 1;
        }
        let slot = match e.shape() {
            Shape::Bare => 0,
            Shape::Basic => 1,
            Shape::Interaction => 2,
            Shape::Rating => 3,
        };
        summary.shapes[slot] += 1;

        if let Some(value) = rating_of(e) {
            ratings.push(value);
        }
        if let Ok(interaction) = project::<Interaction>(e) {
            users.insert(interaction.user_id());
            items.insert(interaction.item_id());
        }
    }

    summary.rated = ratings.len();
    if !ratings.is_empty() {
        summary.mean_rating = Some(ratings.iter().sum::<f64>() / ratings.len() as f64);
        summary.min_rating = ratings.iter().copied().reduce(f64::min);
        summary.max_rating = ratings.iter().copied().reduce(f64::max);
    }
    summary.users = users.len();
    summary.items = items.len();
    summary
}

fn run_summarize(
    vocab: &Vocabulary,
    file: &Path,
    delimiter: char,
    entity_type: &str,
    user: Option<i64>,
) -> Result<()> {
    if !delimiter.is_ascii() {
        bail!("Delimiter must be a single ASCII character, got {:?}", delimiter);
    }

    println!("📂 Loading {}...", file.display());
    let reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .trim(csv::Trim::Headers)
        .from_path(file)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    let mut entities = load_entities(reader, vocab, entity_type)?;
    println!("✓ Loaded {} entities", entities.len());

    if let Some(user) = user {
        let of_user = attribute_value_predicate(&vocab.common().user_id, user);
        entities.retain(|e| of_user(e));
        println!("✓ {} entities belong to user {}", entities.len(), user);
    }

    let summary = summarize(vocab, &entities, entity_type);
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Entities:       {}", summary.entities);
    println!("Of type {}: {}", entity_type, summary.matching_type);
    println!(
        "Shapes:         bare={} basic={} interaction={} rating={}",
        summary.shapes[0], summary.shapes[1], summary.shapes[2], summary.shapes[3]
    );
    println!("Distinct users: {}", summary.users);
    println!("Distinct items: {}", summary.items);
    println!("Rated:          {}", summary.rated);
    if let (Some(mean), Some(min), Some(max)) = (summary.mean_rating, summary.min_rating, summary.max_rating) {
        println!("Rating:         mean={:.3} min={} max={}", mean, min, max);
    }

    Ok(())
}

fn run_vocab(vocab: &Vocabulary) {
    println!("Entity types:");
    for t in vocab.entity_types() {
        println!("  {}", t);
    }
    println!("Attributes:");
    for name in vocab.attribute_names() {
        let description = vocab
            .definition(name.name())
            .map(|def| def.description)
            .unwrap_or_default();
        println!("  {:<16} {:<10} {}", name.name(), name.kind(), description);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(data: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new().from_reader(data.as_bytes())
    }

    #[test]
    fn test_load_entities_builds_ratings() {
        let vocab = Vocabulary::new();
        let data = "id,user,item,rating,timestamp\n42,3,7,4.5,1000\n43,3,8,2,\n";
        let entities = load_entities(reader(data), &vocab, "rating").unwrap();

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].id(), 42);
        assert_eq!(entities[0].shape(), Shape::Rating);
        assert_eq!(entities[1].get(&vocab.common().rating).unwrap(), &2.0);
        assert!(!entities[1].has_attribute("timestamp"));
    }

    #[test]
    fn test_load_entities_reports_line_of_bad_cell() {
        let vocab = Vocabulary::new();
        let data = "user,item,rating\n3,7,4.5\n3,x,2\n";
        let err = load_entities(reader(data), &vocab, "rating").unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Line 3"), "{}", message);
        assert!(message.contains("type mismatch"), "{}", message);
    }

    #[test]
    fn test_summarize() {
        let vocab = Vocabulary::new();
        let data = "user,item,rating\n1,10,4\n1,11,2\n2,10,3\n";
        let entities = load_entities(reader(data), &vocab, "rating").unwrap();
        let summary = summarize(&vocab, &entities, "rating");

        assert_eq!(summary.entities, 3);
        assert_eq!(summary.matching_type, 3);
        assert_eq!(summary.shapes, [0, 0, 0, 3]);
        assert_eq!(summary.users, 2);
        assert_eq!(summary.items, 2);
        assert_eq!(summary.mean_rating, Some(3.0));
        assert_eq!(summary.min_rating, Some(2.0));
        assert_eq!(summary.max_rating, Some(4.0));
    }
}
