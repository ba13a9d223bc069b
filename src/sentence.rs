use std::future::Future;

use log::warn;

use crate::recognition::ClassifyError;

/// Remote text-completion boundary used for sentence reconstruction. The
/// only contract is "ordered words in, one string out".
pub trait SentenceBackend: Send + Sync {
    fn complete_sentence(
        &self,
        words: &[String],
    ) -> impl Future<Output = Result<String, ClassifyError>> + Send;
}

/// Accumulates recognized gesture labels in signing order and, on demand,
/// asks the backend to reconstruct a grammatical sentence from them.
///
/// The word list is ephemeral session state: duplicates are kept, order is
/// significant, and it is cleared explicitly by the user or after building.
pub struct SentenceAssembler<B: SentenceBackend> {
    backend: B,
    words: Vec<String>,
}

impl<B: SentenceBackend> SentenceAssembler<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            words: Vec::new(),
        }
    }

    /// Append one recognized label. Blank labels are dropped; anything else
    /// is kept verbatim, duplicates included.
    pub fn append_recognition(&mut self, label: &str) {
        let trimmed = label.trim();
        if !trimmed.is_empty() {
            self.words.push(trimmed.to_string());
        }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }

    /// Build a sentence from the session's words and clear them.
    pub async fn finish_sentence(&mut self) -> String {
        let sentence = self.build_sentence(&self.words.clone()).await;
        self.words.clear();
        sentence
    }

    /// Reconstruct a natural sentence from `words`.
    ///
    /// Empty input returns the empty string without touching the backend.
    /// Any backend failure (or a blank response) falls back to joining the
    /// words with spaces; the user always gets to see what they signed.
    pub async fn build_sentence(&self, words: &[String]) -> String {
        if words.is_empty() {
            return String::new();
        }

        match self.backend.complete_sentence(words).await {
            Ok(sentence) if !sentence.trim().is_empty() => sentence.trim().to_string(),
            Ok(_) => words.join(" "),
            Err(err) => {
                warn!("sentence reconstruction failed, falling back to raw words: {err}");
                words.join(" ")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeBackend {
        response: Result<String, ClassifyError>,
        calls: AtomicUsize,
    }

    impl FakeBackend {
        fn ok(sentence: &str) -> Self {
            Self {
                response: Ok(sentence.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                response: Err(ClassifyError::Transport("offline".into())),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SentenceBackend for FakeBackend {
        async fn complete_sentence(&self, _words: &[String]) -> Result<String, ClassifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|w| w.to_string()).collect()
    }

    #[tokio::test]
    async fn empty_word_list_returns_empty_without_remote_call() {
        let assembler = SentenceAssembler::new(FakeBackend::ok("unused"));
        assert_eq!(assembler.build_sentence(&[]).await, "");
        assert_eq!(assembler.backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remote_failure_falls_back_to_space_joined_words() {
        let assembler = SentenceAssembler::new(FakeBackend::failing());
        let sentence = assembler.build_sentence(&words(&["hello", "water"])).await;
        assert_eq!(sentence, "hello water");
    }

    #[tokio::test]
    async fn remote_sentence_is_returned_trimmed() {
        let assembler = SentenceAssembler::new(FakeBackend::ok("  I would like some water.  "));
        let sentence = assembler.build_sentence(&words(&["I", "water"])).await;
        assert_eq!(sentence, "I would like some water.");
    }

    #[tokio::test]
    async fn blank_remote_response_falls_back() {
        let assembler = SentenceAssembler::new(FakeBackend::ok("   "));
        let sentence = assembler.build_sentence(&words(&["hello"])).await;
        assert_eq!(sentence, "hello");
    }

    #[test]
    fn append_keeps_order_and_duplicates_and_drops_blanks() {
        let mut assembler = SentenceAssembler::new(FakeBackend::ok(""));
        assembler.append_recognition("hello");
        assembler.append_recognition("  ");
        assembler.append_recognition("water");
        assembler.append_recognition("hello");
        assert_eq!(assembler.words(), &["hello", "water", "hello"]);

        assembler.clear();
        assert!(assembler.words().is_empty());
    }

    #[tokio::test]
    async fn finish_sentence_clears_the_session() {
        let mut assembler = SentenceAssembler::new(FakeBackend::failing());
        assembler.append_recognition("hello");
        assembler.append_recognition("friend");
        assert_eq!(assembler.finish_sentence().await, "hello friend");
        assert!(assembler.words().is_empty());
    }
}
