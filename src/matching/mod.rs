//! Tweet matching: n-gram name matches and bounding-box geo matches.

mod ngrams;
mod tweet;

pub use ngrams::{ngrams, normalize_text, tokens, tweet_ngrams, MAX_NGRAM};
pub use tweet::{geo_bounds, match_tweet, TweetMatchOutcome, LAT_DELTA, LON_DELTA};
