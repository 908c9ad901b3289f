/// Delimiter used for the sentence pass.
pub const SENTENCE_DELIMITER: &str = ". ";

/// Character budget per chunk used by the embedding aggregator.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 4_000;

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits `text` into chunks of at most `max_chunk_chars` characters.
///
/// Sentences (separated by `". "`) are packed greedily first. A sentence that
/// cannot fit on its own is packed word by word, and a final pass re-packs any
/// chunk that is still oversized. A single word longer than the limit is kept
/// whole as its own chunk. Output order always follows the input.
pub fn split_into_chunks(text: &str, max_chunk_chars: usize) -> Vec<String> {
    let max_chunk_chars = max_chunk_chars.max(1);
    let delimiter_len = char_len(SENTENCE_DELIMITER);

    let fragments: Vec<&str> = text.split(SENTENCE_DELIMITER).collect();
    let last_index = fragments.len().saturating_sub(1);

    let mut chunks = Vec::new();
    let mut current = String::new();

    for (index, fragment) in fragments.iter().enumerate() {
        let delimiter = if index < last_index {
            SENTENCE_DELIMITER
        } else {
            ""
        };

        let fragment_len = char_len(fragment);
        let candidate_len = char_len(&current) + fragment_len + delimiter_len;

        if candidate_len <= max_chunk_chars {
            current.push_str(fragment);
            current.push_str(delimiter);
            continue;
        }

        if !current.is_empty() {
            close_chunk(&mut chunks, &mut current);
        }

        if fragment_len + delimiter_len <= max_chunk_chars {
            current.push_str(fragment);
            current.push_str(delimiter);
            continue;
        }

        let mut packed = pack_words(fragment, max_chunk_chars);
        if let Some(tail) = packed.pop() {
            chunks.extend(packed);
            current.push_str(&tail);
            current.push_str(delimiter);
        }
    }

    if !current.is_empty() {
        close_chunk(&mut chunks, &mut current);
    }

    let mut final_chunks = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if char_len(&chunk) <= max_chunk_chars {
            final_chunks.push(chunk);
        } else {
            final_chunks.extend(pack_words(&chunk, max_chunk_chars));
        }
    }

    final_chunks
}

fn close_chunk(chunks: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim_end();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
    current.clear();
}

/// Greedy word packing: words are joined with single spaces until the next
/// word would push the run past `max_chunk_chars`.
fn pack_words(text: &str, max_chunk_chars: usize) -> Vec<String> {
    let mut packed = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = char_len(word);

        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
            continue;
        }

        if current_len + 1 + word_len <= max_chunk_chars {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            packed.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        packed.push(current);
    }

    packed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(count: usize, body_len: usize) -> String {
        (0..count)
            .map(|_| "x".repeat(body_len))
            .collect::<Vec<_>>()
            .join(SENTENCE_DELIMITER)
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(split_into_chunks("", 10).is_empty());
        assert!(split_into_chunks("   \n  ", 10).is_empty());
    }

    #[test]
    fn nine_thousand_characters_split_into_three_chunks() {
        let mut text = sentences(89, 98);
        text.push_str(SENTENCE_DELIMITER);
        text.push_str(&"y".repeat(100));
        assert_eq!(char_len(&text), 9_000);

        let chunks = split_into_chunks(&text, 4_000);

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|chunk| char_len(chunk) <= 4_000));
        assert!(chunks[2].ends_with(&"y".repeat(100)));
    }

    #[test]
    fn chunks_preserve_content_in_order() {
        let text = "Scope covers the portal. Budget is capped at 2 billion KRW. \
                    Deadline is March 3rd. Evaluation weighs technical merit 80 percent";
        let chunks = split_into_chunks(text, 40);

        assert!(chunks.len() > 1);
        let rebuilt = chunks.join(" ");
        let original_words: Vec<&str> = text.split_whitespace().collect();
        let rebuilt_words: Vec<&str> = rebuilt.split_whitespace().collect();
        assert_eq!(original_words, rebuilt_words);
    }

    #[test]
    fn oversized_sentence_falls_back_to_word_packing() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let chunks = split_into_chunks(text, 16);

        assert!(chunks.iter().all(|chunk| char_len(chunk) <= 16));
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn single_oversized_word_is_kept_whole() {
        let word = "w".repeat(25);
        let text = format!("short one. {word} tail");
        let chunks = split_into_chunks(&text, 10);

        assert!(chunks.contains(&word));
        let oversized: Vec<_> = chunks.iter().filter(|chunk| char_len(chunk) > 10).collect();
        assert_eq!(oversized, vec![&word]);
    }

    #[test]
    fn lengths_are_counted_in_characters() {
        let text = "가나다라마바사. 아자차카타파하. 가나다라마바사";
        let chunks = split_into_chunks(text, 10);

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|chunk| char_len(chunk) <= 10));
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = sentences(120, 57);
        assert_eq!(split_into_chunks(&text, 500), split_into_chunks(&text, 500));
    }
}
