use super::*;

fn chunker() -> DocumentChunker {
    DocumentChunker::new(ChunkerConfig::default()).expect("default chunker config is valid")
}

fn long_text(sentences: usize) -> String {
    (0..sentences)
        .map(|index| {
            format!(
                "Sentence {index} discusses clause {} of the supply agreement in some detail.",
                index * 7
            )
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn metadata() -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("case_name".to_string(), Value::from("Doe v. Acme"));
    metadata
}

#[test]
fn blank_input_produces_no_chunks() {
    assert!(chunker().chunk_document("  \n\n [Page 1]\n ", &Metadata::new()).is_empty());
}

#[test]
fn text_shorter_than_min_size_produces_no_chunks() {
    let chunks = chunker().chunk_document(
        "[Page 1]\nA short letter of about fifty characters total.\n",
        &metadata(),
    );
    assert!(chunks.is_empty());
}

#[test]
fn text_of_min_size_is_a_single_chunk() {
    let min_size = ChunkerConfig::default().min_size;
    let text = format!("[Page 1]\n{}", "a".repeat(min_size));
    let chunks = chunker().chunk_document(&text, &metadata());
    assert_eq!(chunks.len(), 1);

    let chunk = &chunks[0];
    assert_eq!((chunk.start_char, chunk.end_char), (0, min_size));
    assert_eq!(chunk.metadata.get("total_chunks"), Some(&Value::from(1)));
    assert_eq!(chunk.metadata.get("has_overlap"), Some(&Value::Bool(false)));
    assert_eq!(chunk.metadata.get("case_name"), Some(&Value::from("Doe v. Acme")));
}

#[test]
fn consecutive_chunks_overlap_by_the_configured_amount() {
    let chunker = chunker();
    let text = long_text(80);
    let cleaned = chunker.clean_text(&text);
    let chars = cleaned.chars().collect::<Vec<char>>();
    let chunks = chunker.chunk_document(&text, &metadata());
    let config = chunker.config();

    assert!(chunks.len() > 3, "expected several chunks, got {}", chunks.len());
    assert_eq!(chunks[0].start_char, 0);
    assert_eq!(chunks.last().map(|chunk| chunk.end_char), Some(chars.len()));

    for pair in chunks.windows(2) {
        let (current, next) = (&pair[0], &pair[1]);
        assert_eq!(next.start_char, current.end_char - config.overlap);

        let tail = current
            .content
            .chars()
            .skip(current.content.chars().count() - config.overlap)
            .collect::<String>();
        let head = next.content.chars().take(config.overlap).collect::<String>();
        assert_eq!(tail, head, "overlap text differs at chunk {}", next.chunk_index);
    }

    for chunk in &chunks {
        let size = chunk.end_char - chunk.start_char;
        assert!(size <= config.max_size, "chunk {} too long: {size}", chunk.chunk_index);
        assert!(size >= config.min_size, "chunk {} too short: {size}", chunk.chunk_index);
        assert_eq!(
            chunk.content,
            chars[chunk.start_char..chunk.end_char].iter().collect::<String>()
        );
        assert_eq!(
            chunk.metadata.get("total_chunks"),
            Some(&Value::from(chunks.len()))
        );
        assert_eq!(
            chunk.metadata.get("has_overlap"),
            Some(&Value::Bool(chunk.chunk_index > 0))
        );
    }
}

#[test]
fn paragraph_breaks_win_over_sentence_breaks() {
    let paragraph = "Lorem ipsum dolor sit amet. ".repeat(32).trim_end().to_string();
    let text = [paragraph.as_str(), paragraph.as_str(), paragraph.as_str()].join("\n\n");

    let chunks = chunker().chunk_document(&text, &Metadata::new());
    assert_eq!(chunks[0].end_char, paragraph.chars().count() + 2);
    assert!(chunks[0].content.ends_with("\n\n"));
}

#[test]
fn sentence_break_closest_to_target_is_chosen() {
    let chunker = chunker();
    let text = long_text(40);
    let chars = chunker.clean_text(&text).chars().collect::<Vec<char>>();

    let end = chunker.find_chunk_end(&chars, 0);
    assert_eq!(chars[end - 1], '.');
    assert!(chars[end].is_whitespace());
    let target = chunker.config().target_size;
    let nearest = (800..=1200)
        .filter(|&position| chars[position - 1] == '.' && chars[position] == ' ')
        .map(|position| position.abs_diff(target))
        .min()
        .expect("sentence breaks exist in the window");
    assert_eq!(end.abs_diff(target), nearest);
}

#[test]
fn unbroken_text_falls_back_to_target_size() {
    let text = "x".repeat(2600);
    let chunks = chunker().chunk_document(&text, &Metadata::new());
    assert_eq!(chunks[0].end_char, 1000);
    assert_eq!(chunks[1].start_char, 800);
}

#[test]
fn small_tail_is_absorbed() {
    let config = ChunkerConfig::default();
    let text = "word ".repeat(210).trim_end().to_string();
    let chunks = chunker().chunk_document(&text, &Metadata::new());

    assert_eq!(chunks.len(), 1, "splitting 1049 characters would leave a short tail");
    assert_eq!(chunks[0].end_char, 1049);
    assert!(chunks[0].end_char <= config.max_size);

    let longer = "word ".repeat(300).trim_end().to_string();
    let chunks = chunker().chunk_document(&longer, &Metadata::new());
    let last = chunks.last().expect("at least one chunk");
    assert!(last.end_char - last.start_char >= config.min_size);
}

#[test]
fn offsets_count_characters_not_bytes() {
    let text = format!("§ {}", "résumé clause é. ".repeat(120));
    let chunker = chunker();
    let cleaned = chunker.clean_text(&text);
    let chunks = chunker.chunk_document(&text, &Metadata::new());

    assert_eq!(
        chunks.last().map(|chunk| chunk.end_char),
        Some(cleaned.chars().count())
    );
    for chunk in &chunks {
        assert_eq!(chunk.content.chars().count(), chunk.end_char - chunk.start_char);
    }
}

#[test]
fn cleaning_strips_markers_and_collapses_whitespace() {
    let cleaned = chunker().clean_text("[Page 1]\nFirst\t\tline   here\n\n\n\n[Page 2]\nSecond");
    assert_eq!(cleaned, "First line here\n\nSecond");
}

#[test]
fn invalid_configuration_is_rejected() {
    let config = ChunkerConfig {
        target_size: 200,
        ..ChunkerConfig::default()
    };
    assert!(DocumentChunker::new(config).is_err());
}
