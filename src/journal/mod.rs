//! Journal and entry workflow.
//!
//! Every write that changes an entry's paragraphs re-aggregates the full
//! paragraph list and stores the new label and distribution. The read of the
//! current paragraphs, the aggregation and the update share one immediate
//! transaction, so concurrent appends to the same entry serialize.

use crate::analysis::Aggregator;
use crate::classifier::Classifier;
use crate::error::{AppError, AppResult};
use crate::models::{Entry, Journal, RecomputeFailure, RecomputeSummary, User};
use crate::store::{entries, journals, Store};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tracing::{debug, info, warn};

/// Journal operations on behalf of an authenticated user.
pub struct JournalService {
    store: Store,
    classifier: Box<dyn Classifier>,
    aggregator: Aggregator,
}

impl JournalService {
    pub fn new(store: Store, classifier: Box<dyn Classifier>, aggregator: Aggregator) -> Self {
        Self {
            store,
            classifier,
            aggregator,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn create_journal(&self, user: &User, title: &str) -> AppResult<Journal> {
        let journal = journals::insert(self.store.conn(), user.id, title.trim())?;
        info!(journal_id = journal.id, "Created journal '{}'", journal.title);
        Ok(journal)
    }

    /// Journals of the user, newest first.
    pub fn list_journals(&self, user: &User) -> AppResult<Vec<Journal>> {
        Ok(journals::list_for_user(self.store.conn(), user.id)?)
    }

    /// The journal created with the account.
    pub fn default_journal(&self, user: &User) -> AppResult<Journal> {
        journals::first_for_user(self.store.conn(), user.id)?.ok_or(AppError::NoJournal)
    }

    pub fn create_entry(&self, user: &User, journal_id: i64) -> AppResult<Entry> {
        let conn = self.store.conn();
        owned_journal(conn, user, journal_id)?;
        let entry = entries::insert(conn, journal_id)?;
        info!(entry_id = entry.id, journal_id, "Created entry");
        Ok(entry)
    }

    /// Append one paragraph and re-aggregate the entry.
    pub async fn append_paragraph(
        &mut self,
        user: &User,
        journal_id: i64,
        entry_id: i64,
        paragraph: String,
    ) -> AppResult<Entry> {
        self.append_batch(user, journal_id, entry_id, &[paragraph])
            .await
    }

    /// Append paragraphs in order and re-aggregate the entry once.
    pub async fn append_batch(
        &mut self,
        user: &User,
        journal_id: i64,
        entry_id: i64,
        paragraphs: &[String],
    ) -> AppResult<Entry> {
        let tx = self.store.write_transaction()?;

        owned_journal(&tx, user, journal_id)?;
        entry_in_journal(&tx, entry_id, journal_id)?;

        let texts = entries::append_paragraphs(&tx, entry_id, paragraphs)?;
        let analysis = self
            .aggregator
            .aggregate(self.classifier.as_ref(), &texts)
            .await;
        entries::update_analysis(&tx, entry_id, &analysis)?;

        let entry = entries::get_by_id(&tx, entry_id)?.ok_or(AppError::EntryNotFound(entry_id))?;
        tx.commit()?;

        info!(
            entry_id,
            appended = paragraphs.len(),
            paragraphs = entry.texts.len(),
            label = %entry.label,
            "Updated entry"
        );
        Ok(entry)
    }

    pub fn get_entry(&self, user: &User, journal_id: i64, entry_id: i64) -> AppResult<Entry> {
        let conn = self.store.conn();
        owned_journal(conn, user, journal_id)?;
        entry_in_journal(conn, entry_id, journal_id)?;
        entries::get_by_id(conn, entry_id)?.ok_or(AppError::EntryNotFound(entry_id))
    }

    /// Entries of an owned journal, in creation order.
    pub fn list_entries(&self, user: &User, journal_id: i64) -> AppResult<Vec<Entry>> {
        let conn = self.store.conn();
        owned_journal(conn, user, journal_id)?;
        Ok(entries::list_for_journal(conn, journal_id)?)
    }

    /// Re-aggregate every stored entry. Admin only.
    ///
    /// Each entry is rewritten in its own transaction; a failing entry is
    /// recorded and the run continues.
    pub async fn recompute_all(
        &mut self,
        user: &User,
        show_progress: bool,
    ) -> AppResult<RecomputeSummary> {
        if !user.is_admin() {
            return Err(AppError::AdminRequired);
        }

        let ids = entries::list_all_ids(self.store.conn())?;
        info!("Recomputing {} entries", ids.len());

        let progress = if show_progress {
            let pb = ProgressBar::new(ids.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} entries")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut summary = RecomputeSummary::default();
        for entry_id in ids {
            match self.recompute_entry(entry_id).await {
                Ok(()) => summary.updated += 1,
                Err(e) => {
                    warn!(entry_id, error = %e, "Could not recompute entry");
                    summary.errors.push(RecomputeFailure {
                        entry_id,
                        error: e.to_string(),
                    });
                }
            }
            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        info!(
            updated = summary.updated,
            failed = summary.errors.len(),
            "Recompute finished"
        );
        Ok(summary)
    }

    async fn recompute_entry(&mut self, entry_id: i64) -> AppResult<()> {
        let tx = self.store.write_transaction()?;
        let texts = entries::load_texts(&tx, entry_id)?.ok_or(AppError::EntryNotFound(entry_id))?;

        let analysis = self
            .aggregator
            .aggregate(self.classifier.as_ref(), &texts)
            .await;
        entries::update_analysis(&tx, entry_id, &analysis)?;
        tx.commit()?;

        debug!(entry_id, label = %analysis.label, "Recomputed entry");
        Ok(())
    }
}

/// Journal that exists and belongs to `user`.
fn owned_journal(conn: &Connection, user: &User, journal_id: i64) -> AppResult<Journal> {
    let journal = journals::get_by_id(conn, journal_id)?.ok_or(AppError::JournalNotFound(journal_id))?;
    if journal.user_id != user.id {
        return Err(AppError::Forbidden);
    }
    Ok(journal)
}

fn entry_in_journal(conn: &Connection, entry_id: i64, journal_id: i64) -> AppResult<()> {
    match entries::journal_of(conn, entry_id)? {
        None => Err(AppError::EntryNotFound(entry_id)),
        Some(owner) if owner != journal_id => Err(AppError::EntryMismatch {
            entry_id,
            journal_id,
        }),
        Some(_) => Ok(()),
    }
}
