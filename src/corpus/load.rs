use super::{Corpus, CorpusSource, LoadCorpusProblem};
use anyhow::{Context, Result};
use tracing::{info, warn};

pub fn load_corpus(source: &dyn CorpusSource) -> Result<Corpus> {
    info!("Loading corpus from {}...", source.describe());
    let records = source
        .load_records()
        .with_context(|| format!("Could not read songs from {}", source.describe()))?;
    let record_count = records.len();

    let result = Corpus::build(records);
    let problems = result.problems;
    let mut corpus = result.corpus;

    if !problems.is_empty() {
        info!("Found {} problems:", problems.len());
        for problem in problems.iter() {
            match problem {
                LoadCorpusProblem::UnknownKey { .. } | LoadCorpusProblem::DuplicateId(_) => {
                    warn!("- {}", problem)
                }
                _ => info!("- {}", problem),
            }
        }
    }

    if problems.is_empty() {
        info!("Corpus checked, no issues found.");
    } else {
        info!(
            "Corpus was built, but check the {} non-fatal issues above.",
            problems.len()
        );
    }
    info!(
        "Corpus has {} songs ({} rows read).",
        corpus.len(),
        record_count
    );

    let links = source
        .load_links()
        .with_context(|| format!("Could not read song links from {}", source.describe()))?;
    let link_count = links.len();
    let orphans = corpus.attach_links(links);
    if orphans > 0 {
        info!("Ignored {} links to songs not in the corpus.", orphans);
    }
    if link_count > 0 {
        info!("Attached {} song links.", link_count - orphans);
    }

    Ok(corpus)
}
