mod common;

use common::{law, original_law, ymd};
use lawgit::{resolve, Citation, CitationError, Gazette, LawDocument};

fn parse(xml: &str) -> LawDocument {
    LawDocument::parse(xml).unwrap()
}

#[test]
fn banz_at_reference_is_fully_dated() {
    let doc = parse(&original_law("Verordnung", "BAnz AT", "AT 05.02.2019 54"));
    let citation = resolve(&doc).unwrap();
    assert_eq!(
        citation,
        Citation {
            gazette: Gazette::BAnzAt,
            year: 2019,
            month: Some(2),
            day: Some(5),
            page: None,
            index: Some("54".to_string()),
        }
    );
    assert!(!citation.is_partial());
}

#[test]
fn bgbl_origin_reference_is_partial_until_dated() {
    let doc = parse(&original_law("Gesetz", "BGBl I", "2019, 58"));
    let citation = resolve(&doc).unwrap();
    assert_eq!(citation, Citation::partial(Gazette::BgblI, 2019, 58));

    let dated = citation.with_date(ymd(2019, 2, 5)).into_dated().unwrap();
    assert_eq!(dated.date(), ymd(2019, 2, 5));
    assert_eq!(dated.gazette(), &Gazette::BgblI);
}

#[test]
fn amendment_note_wins_over_origin_publication() {
    let xml = law(
        "20190501",
        "Gesetz",
        "Zuletzt geändert durch Art. 3 G v. 20.11.2015 I 2010 und Art. 1 G v. 5.2.2019 I 54",
        "Text.",
    )
    .replace(
        "</metadaten>",
        "<fundstelle><periodikum>BGBl I</periodikum><zitstelle>1998, 100</zitstelle></fundstelle></metadaten>",
    );
    let citation = resolve(&parse(&xml)).unwrap();
    assert_eq!(citation, Citation::dated(Gazette::BgblI, ymd(2019, 2, 5), Some(54)));
}

#[test]
fn documents_without_any_citation_are_rejected() {
    let doc = parse("<dokumente><norm><metadaten><jurabk>X</jurabk></metadaten></norm></dokumente>");
    assert_eq!(resolve(&doc), Err(CitationError::NoCitation));

    let doc = parse(&original_law("Gesetz", "BGBl I", "S. 58"));
    assert_eq!(resolve(&doc), Err(CitationError::NoCitation));
}
