use super::*;

const FEDERAL_FILING: &str = "[Page 1]
UNITED STATES DISTRICT COURT
NORTHERN DISTRICT OF CALIFORNIA
Case No. 3:24-cv-01234

PLAINTIFF'S FIRST SET OF REQUESTS FOR PRODUCTION OF DOCUMENTS

DEFINITIONS
1. \"Document\" means any writing or recording of any kind.
2. \"You\" means Defendant and its agents.

REQUESTS FOR PRODUCTION

REQUEST FOR PRODUCTION NO. 1:
All documents concerning the Acme supply contract.

REQUEST FOR PRODUCTION NO. 2:
All emails between you and Acme regarding pricing.
[Page 2]
REQUEST FOR PRODUCTION NO. 3:
All documents identified in response to Request No. 1 or see Request 2.

Dated: January 5, 2024
Respectfully submitted,
/s/ Counsel for Plaintiff
";

fn parser() -> RtpParser {
    RtpParser::new(RtpConfig::default()).expect("parser regexes should compile")
}

fn numbers(requests: &[RtpRequest]) -> Vec<&str> {
    requests
        .iter()
        .map(|request| request.request_number.as_str())
        .collect()
}

#[test]
fn two_simple_requests_are_both_found() {
    let requests = parser()
        .parse("RFP No. 1: Produce X.\n\nRFP No. 2: Produce Y.", 1)
        .expect("simple filing parses");

    assert_eq!(numbers(&requests), vec!["1", "2"]);
    for request in &requests {
        assert_eq!(request.category, RequestCategory::Documents);
        assert_eq!(request.page_range, (1, 1));
        assert!(!request.request_text.contains("RFP No."));
    }
    assert_eq!(requests[0].request_text, "Produce X.");
    assert_eq!(requests[1].request_text, "Produce Y.");
}

#[test]
fn federal_filing_parses_with_pages_categories_and_references() {
    let requests = parser().parse(FEDERAL_FILING, 2).expect("federal filing parses");
    assert_eq!(numbers(&requests), vec!["1", "2", "3"]);

    assert_eq!(requests[0].category, RequestCategory::Documents);
    assert_eq!(requests[0].page_range, (1, 1));
    assert_eq!(
        requests[0].request_text,
        "All documents concerning the Acme supply contract."
    );

    assert_eq!(requests[1].category, RequestCategory::Communications);
    assert_eq!(
        requests[1].page_range,
        (1, 1),
        "the page marker after request 2 belongs to request 3"
    );
    assert!(!requests[1].request_text.contains("[Page"));

    let last = &requests[2];
    assert_eq!(last.page_range, (2, 2));
    assert_eq!(last.cross_references, vec!["1", "2"]);
    assert!(
        !last.request_text.contains("Dated"),
        "closing block leaked into {:?}",
        last.request_text
    );

    for request in &requests {
        assert!(!request.request_text.contains("means any writing"));
        assert!((0.0..=1.0).contains(&request.confidence_score));
        assert!(request.request_text.chars().count() > 0);
    }
}

#[test]
fn parsing_is_idempotent_and_streaming_matches() {
    let parser = parser();
    let first = parser.parse(FEDERAL_FILING, 2).expect("first parse");
    let second = parser.parse(FEDERAL_FILING, 2).expect("second parse");
    assert_eq!(first, second);

    let streamed = parser
        .parse_streaming(FEDERAL_FILING, 2)
        .expect("stream builds")
        .collect::<RtpResult<Vec<RtpRequest>>>()
        .expect("stream parses");
    assert_eq!(first, streamed);
}

#[test]
fn streaming_threshold_does_not_change_output() {
    let eager = parser().parse(FEDERAL_FILING, 2).expect("eager parse");
    let streaming_parser = RtpParser::new(RtpConfig {
        streaming_threshold_bytes: 16,
        memory_check_interval: 1,
        ..RtpConfig::default()
    })
    .expect("parser builds");

    let streamed = streaming_parser
        .parse_document(FEDERAL_FILING, 2)
        .expect("streaming parse");
    assert_eq!(eager, streamed);
}

#[test]
fn lettered_subrequests_link_to_their_parent() {
    let text = "[Page 1]
REQUESTS FOR PRODUCTION

RFP No. 5: All documents relating to the merger, including:
5a. Board minutes approving the merger.
5b. Correspondence with regulators about the merger.
";
    let requests = parser().parse(text, 1).expect("subpart filing parses");
    assert_eq!(numbers(&requests), vec!["5", "5a", "5b"]);
    assert_eq!(requests[0].parent_request, None);
    assert_eq!(requests[1].parent_request.as_deref(), Some("5"));
    assert_eq!(requests[2].parent_request.as_deref(), Some("5"));
    assert_eq!(requests[1].category, RequestCategory::Documents);
    assert_eq!(requests[2].category, RequestCategory::Communications);
}

#[test]
fn definitions_are_removed_without_losing_page_positions() {
    let text = "[Page 1]
DEFINITIONS
\"Communication\" means any transmission of information by any means.
[Page 2]
REQUESTS FOR PRODUCTION
RFP No. 1: All communications with the county assessor.
";
    let parser = parser();
    let prepared = parser.prepare(text, 2).expect("filing prepares");
    assert_eq!(prepared.format, DocumentFormat::DefinitionFirst);
    assert!(prepared.text.contains(DEFINITIONS_PLACEHOLDER));
    assert!(!prepared.text.contains("transmission of information"));

    let requests = parser.parse(text, 2).expect("filing parses");
    assert_eq!(numbers(&requests), vec!["1"]);
    assert_eq!(requests[0].page_range, (2, 2));
    assert_eq!(requests[0].category, RequestCategory::Communications);
}

#[test]
fn merged_range_becomes_one_request_unless_shadowed() {
    let merged = "REQUESTS FOR PRODUCTION

Requests 1 through 3: All documents concerning the warehouse lease.

RFP No. 4: All photographs of the warehouse loading dock.
";
    let requests = parser().parse(merged, 1).expect("merged filing parses");
    assert_eq!(numbers(&requests), vec!["1-3", "4"]);
    assert_eq!(requests[0].parent_request, None);
    assert_eq!(requests[1].category, RequestCategory::TangibleThings);

    let shadowed = "REQUESTS FOR PRODUCTION

Requests 1 through 2: All documents about the lease agreement.

RFP No. 1: All lease agreements for the warehouse property.

RFP No. 2: All invoices issued under the warehouse lease.
";
    let requests = parser().parse(shadowed, 1).expect("shadowed filing parses");
    assert_eq!(numbers(&requests), vec!["1", "2"]);
}

#[test]
fn short_segments_are_discarded() {
    let text = "REQUESTS FOR PRODUCTION

RFP No. 1: Logs.

RFP No. 2: All maintenance logs for the elevator in Building C.
";
    let requests = parser().parse(text, 1).expect("filing parses");
    assert_eq!(numbers(&requests), vec!["2"]);
}

#[test]
fn state_demands_are_normalized() {
    let text = "SUPERIOR COURT OF THE STATE OF CALIFORNIA
COUNTY OF ALAMEDA

DEMAND FOR PRODUCTION NO. 1: All records of payments made to the contractor.

DEMAND FOR PRODUCTION NO. 2: All text messages exchanged with the contractor.
";
    let parser = parser();
    let prepared = parser.prepare(text, 1).expect("state filing prepares");
    assert_eq!(prepared.format, DocumentFormat::State);

    let requests = parser.parse(text, 1).expect("state filing parses");
    assert_eq!(numbers(&requests), vec!["1", "2"]);
    assert_eq!(requests[0].category, RequestCategory::Documents);
    assert_eq!(requests[1].category, RequestCategory::Communications);
}

#[test]
fn bare_numbered_paragraphs_carry_low_confidence() {
    let text = "DOCUMENT REQUESTS

1. All documents reflecting the purchase price of the parcel.

2. All appraisals of the parcel prepared since 2019.
";
    let requests = parser().parse(text, 1).expect("bare numbering parses");
    assert_eq!(numbers(&requests), vec!["1", "2"]);
    assert!(requests.iter().all(|request| request.confidence_score <= 0.5));
}

#[test]
fn bare_parents_survive_alongside_lettered_subparts() {
    let text = "REQUESTS FOR PRODUCTION

1. All documents concerning the lease of the warehouse.

1a. All amendments to the warehouse lease.

2. All invoices issued under the warehouse lease.
";
    let requests = parser().parse(text, 1).expect("mixed numbering parses");
    assert_eq!(numbers(&requests), vec!["1", "1a", "2"]);
    assert_eq!(requests[0].parent_request, None);
    assert_eq!(requests[1].parent_request.as_deref(), Some("1"));
    assert!(!requests[0].request_text.contains("amendments"));
}

#[test]
fn numbered_lists_inside_labelled_requests_stay_in_their_request() {
    let text = "REQUESTS FOR PRODUCTION

RFP No. 1: All documents concerning the warehouse, including:
1. signed leases and renewals for the property;
2. inspection reports for the loading dock.

RFP No. 2: All photographs of the warehouse roof.
";
    let requests = parser().parse(text, 1).expect("nested list parses");
    assert_eq!(numbers(&requests), vec!["1", "2"]);
    assert!(requests[0].request_text.contains("inspection reports"));
    assert!(requests[1].request_text.starts_with("All photographs"));
}

#[test]
fn capitalized_section_headings_are_not_requests() {
    let text = "II. REQUESTS FOR PRODUCTION

1. All documents reflecting the purchase price of the parcel.

2. All appraisals of the parcel prepared since 2019.
";
    let requests = parser().parse(text, 1).expect("headed filing parses");
    assert_eq!(numbers(&requests), vec!["1", "2"]);
}

#[test]
fn memory_ceiling_warns_without_dropping_requests() {
    let mut text = String::from("[Page 1]\nREQUESTS FOR PRODUCTION\n\n");
    for number in 1..=12 {
        text.push_str(&format!(
            "RFP No. {number}: All documents concerning shipment batch {number}.\n\n"
        ));
    }

    let parser = RtpParser::new(RtpConfig {
        memory_limit_mb: 1,
        memory_check_interval: 5,
        ..RtpConfig::default()
    })
    .expect("parser builds");
    let mut stream = parser.parse_streaming(&text, 1).expect("stream builds");

    let mut produced = 0;
    for request in stream.by_ref() {
        request.expect("request parses");
        produced += 1;
    }
    assert_eq!(produced, 12);
    if stream.monitor.resident_bytes().is_some() {
        assert!(stream.monitor.warned(), "a 1 MiB ceiling must be exceeded");
    }
}

#[test]
fn error_kinds_match_the_failure() {
    let parser = parser();

    assert!(matches!(
        parser.parse("[Page 1]\n\n[Page 2]\n  tiny", 2),
        Err(RtpError::PdfExtraction(_))
    ));

    assert!(matches!(
        parser.parse(
            "This lease agreement is made between landlord and tenant for 12 Main Street.",
            1
        ),
        Err(RtpError::InvalidFormat(_))
    ));

    assert!(matches!(
        parser.parse(
            "PLAINTIFF'S REQUESTS FOR PRODUCTION\n\nThe responding party shall produce everything relevant.",
            1
        ),
        Err(RtpError::Parsing(_))
    ));

    assert!(matches!(
        parser.parse("REQUESTS FOR PRODUCTION\n\nRFP No. 1: Logs.\n", 1),
        Err(RtpError::Parsing(_))
    ));
}
