//! Built-in selector chains for each record kind
//!
//! Every chain is ordered newest generation first: the embedded data block,
//! then current markup (`data-testid` hooks), then the legacy `lister-*` /
//! `list_item` markup. Update these when the upstream pages change shape, and
//! add a fixture test for the new generation.

use crate::extract::{BatchSpec, Coercion, FieldDefault, RecordSchema};
use crate::normalize::Normalizer;
use crate::selector::{Candidate, SelectorSpec};

const YEAR: &str = r"(\d{4})";
const DECIMAL: &str = r"(\d+(?:\.\d)?)";
const TITLE_ID: &str = r"(tt\d+)";

/// Watchlist / title list: `{title, year, rating}`
pub fn title_list() -> BatchSpec {
    BatchSpec {
        container: SelectorSpec::new(
            "titleList",
            vec![
                Candidate::path("props.pageProps.mainColumnData.predefinedList.titleListItemSearch.edges"),
                Candidate::test_id("list-page-mc-list-content"),
                Candidate::class("lister-list"),
            ],
        ),
        items: Some(SelectorSpec::new(
            "titleListItem",
            vec![
                Candidate::path("*"),
                Candidate::css("li.ipc-metadata-list-summary-item"),
                Candidate::class("lister-item"),
            ],
        )),
        record: RecordSchema::new(vec![
            SelectorSpec::new(
                "title",
                vec![
                    Candidate::path("listItem.titleText.text"),
                    Candidate::css("h3.ipc-title__text"),
                    Candidate::css(".lister-item-header a"),
                ],
            )
            .required(),
            SelectorSpec::new(
                "year",
                vec![
                    Candidate::path("listItem.releaseYear.year").read_as(Coercion::Raw),
                    Candidate::class("dli-title-metadata-item"),
                    Candidate::class("lister-item-year"),
                ],
            )
            .coerce(Coercion::pattern(YEAR)),
            SelectorSpec::new(
                "rating",
                vec![
                    Candidate::path("listItem.ratingsSummary.aggregateRating").read_as(Coercion::Raw),
                    Candidate::test_id("ratingGroup--imdb-rating")
                        .read_as(Coercion::pattern_in("aria-label", DECIMAL)),
                    Candidate::css(".ipl-rating-star__rating"),
                ],
            )
            .coerce(Coercion::pattern(DECIMAL))
            .or_default(FieldDefault::Null),
        ]),
    }
}

/// Cinema showtimes: `{name, address, items: [{title, rating, showtimes, externalId, image}]}`
pub fn venue_listing() -> BatchSpec {
    BatchSpec {
        container: SelectorSpec::new(
            "venueList",
            vec![
                Candidate::test_id("showtimes-cinema-list"),
                Candidate::css("#cinemas-at-list"),
            ],
        ),
        items: Some(SelectorSpec::new(
            "venue",
            vec![
                Candidate::test_id("cinema-card"),
                Candidate::css("div.list_item.cinema"),
            ],
        )),
        record: RecordSchema::new(vec![
            SelectorSpec::new(
                "name",
                vec![Candidate::test_id("cinema-name"), Candidate::css("h3 a")],
            )
            .required(),
            SelectorSpec::new(
                "address",
                vec![Candidate::test_id("cinema-address"), Candidate::class("address")],
            )
            .coerce(Coercion::joined(", ")),
            SelectorSpec::new(
                "items",
                vec![Candidate::test_id("cinema-titles"), Candidate::class("cinema-movies")],
            )
            .coerce(Coercion::Records {
                items: Some(Box::new(SelectorSpec::new(
                    "showing",
                    vec![
                        Candidate::test_id("title-card"),
                        Candidate::css("div.list_item.movie"),
                    ],
                ))),
                record: showing(),
            })
            .or_default(FieldDefault::EmptyList),
        ]),
    }
}

fn showing() -> RecordSchema {
    RecordSchema::new(vec![
        SelectorSpec::new(
            "title",
            vec![Candidate::test_id("title-card-title"), Candidate::css("h4 a")],
        )
        .required(),
        SelectorSpec::new(
            "rating",
            vec![
                Candidate::test_id("title-card-rating").read_as(Coercion::attribute("aria-label")),
                Candidate::class("rating_txt"),
            ],
        )
        .normalize(Normalizer::Rating),
        SelectorSpec::new(
            "showtimes",
            vec![Candidate::test_id("title-card-showtimes"), Candidate::class("showtimes")],
        )
        .coerce(Coercion::joined(", ")),
        SelectorSpec::new(
            "externalId",
            vec![
                Candidate::attribute("data-tconst").read_as(Coercion::attribute("data-tconst")),
                Candidate::css("a[href*='/title/tt']"),
            ],
        )
        .coerce(Coercion::pattern_in("href", TITLE_ID))
        .or_default(FieldDefault::Null),
        SelectorSpec::new(
            "image",
            vec![Candidate::css("img.ipc-image"), Candidate::css(".image img")],
        )
        .coerce(Coercion::attribute("src"))
        .normalize(Normalizer::ImageUpgrade)
        .or_default(FieldDefault::Null),
    ])
}

/// Single title page: `{title, rating, numRatings, description, image, genres, year}`
pub fn item_detail() -> BatchSpec {
    BatchSpec {
        container: SelectorSpec::new(
            "titleDetail",
            vec![
                Candidate::path("props.pageProps.aboveTheFoldData"),
                Candidate::tag("main"),
                Candidate::css("#title-overview-widget"),
            ],
        ),
        items: None,
        record: RecordSchema::new(vec![
            SelectorSpec::new(
                "title",
                vec![
                    Candidate::path("titleText.text"),
                    Candidate::test_id("hero__pageTitle"),
                    Candidate::css(".title_wrapper h1"),
                ],
            )
            .required(),
            SelectorSpec::new(
                "rating",
                vec![
                    Candidate::path("ratingsSummary.aggregateRating").read_as(Coercion::Raw),
                    Candidate::test_id("hero-rating-bar__aggregate-rating__score"),
                    Candidate::class("ratingValue"),
                ],
            )
            .normalize(Normalizer::Rating),
            SelectorSpec::new(
                "numRatings",
                vec![
                    Candidate::path("ratingsSummary.voteCount").read_as(Coercion::Raw),
                    Candidate::test_id("hero-rating-bar__aggregate-rating__vote-count"),
                    Candidate::attribute("itemprop=ratingCount"),
                ],
            )
            .coerce(Coercion::pattern(r"([\d.,]+[KMB]?)"))
            .or_default(FieldDefault::Null),
            SelectorSpec::new(
                "description",
                vec![
                    Candidate::path("plot.plotText.plainText"),
                    Candidate::test_id("plot"),
                    Candidate::class("summary_text"),
                ],
            )
            .coerce(Coercion::joined(" "))
            .normalize(Normalizer::Collapse),
            SelectorSpec::new(
                "image",
                vec![
                    Candidate::path("primaryImage.url").read_as(Coercion::text()),
                    Candidate::css("[data-testid='hero-media__poster'] img"),
                    Candidate::css(".poster img"),
                ],
            )
            .coerce(Coercion::attribute("src"))
            .normalize(Normalizer::ImageUpgrade)
            .or_default(FieldDefault::Null),
            SelectorSpec::new(
                "genres",
                vec![
                    Candidate::path("genres.genres.*.text"),
                    Candidate::css("[data-testid='genres'] .ipc-chip__text"),
                    Candidate::css(".subtext a[href*='genres']"),
                ],
            )
            .coerce(Coercion::ListOfText)
            .or_default(FieldDefault::EmptyList),
            SelectorSpec::new(
                "year",
                vec![
                    Candidate::path("releaseYear.year").read_as(Coercion::Raw),
                    Candidate::css("a[href*='releaseinfo']"),
                    Candidate::css("#titleYear a"),
                ],
            )
            .coerce(Coercion::pattern(YEAR)),
        ]),
    }
}
