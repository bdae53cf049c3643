/// Lowercase substrings matched against `"{title} {description} {category}"`.
/// Every list is plain data so tests can build narrow rule sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRules {
    pub financial: Vec<String>,
    pub crypto: Vec<String>,
    pub big_event: Vec<String>,
    pub exclude: Vec<String>,
    /// Eligibility: explicitly US-specific terms.
    pub us: Vec<String>,
    /// Eligibility: Fed / monetary policy.
    pub fed: Vec<String>,
    /// Eligibility: war and geopolitical conflict.
    pub war: Vec<String>,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

const FINANCIAL: &[&str] = &[
    "bitcoin", "btc", "ethereum", "eth", "crypto", "cryptocurrency",
    "stock", "stocks", "nasdaq", "s&p", "dow", "dow jones",
    "forex", "fx", "currency", "usd", "eur", "gbp", "jpy",
    "commodity", "gold", "silver", "oil", "crude", "gas",
    "bond", "bonds", "treasury", "fed", "federal reserve",
    "inflation", "gdp", "unemployment", "interest rate",
    "earnings", "revenue", "profit", "dividend",
    "ipo", "merger", "acquisition", "bankruptcy",
    "recession", "bull market", "bear market", "volatility",
    "rate cut", "rate increase", "powell", "jerome powell",
    "fed chair", "fed governor", "monetary policy",
    "yield", "treasury yield", "10-year", "30-year",
];

const CRYPTO: &[&str] = &["bitcoin", "btc", "ethereum", "eth", "crypto", "cryptocurrency"];

const WAR: &[&str] = &[
    "war", "conflict", "peace", "treaty", "agreement", "ceasefire",
    "ukraine", "russia", "putin", "zelensky", "nato",
    "israel", "palestine", "gaza", "lebanon", "hezbollah",
    "china", "taiwan", "north korea", "iran", "syria",
    "military", "defense", "weapon", "missile", "drone",
    "sanctions", "embargo", "invasion", "occupation",
];

const US_POLITICS: &[&str] = &[
    "trump", "donald trump", "president", "presidential", "election", "vote", "voting",
    "white house", "congress", "senate", "house", "republican", "democrat",
    "pardon", "impeachment", "inauguration", "cabinet", "supreme court",
    "fbi", "cia", "nsa", "pentagon", "state department",
];

const CRISIS: &[&str] = &[
    "crisis", "emergency", "alert", "warning", "announcement",
    "shutdown", "government shutdown", "debt ceiling",
    "trade war", "tariff", "china trade", "us-china",
];

const EXCLUDE: &[&str] = &[
    // sports
    "football game", "soccer match", "basketball game", "baseball game", "tennis match",
    "golf tournament", "hockey game", "cricket match", "rugby match", "volleyball game",
    "badminton tournament", "table tennis", "swimming competition", "running race", "cycling race",
    "boxing match", "mma fight", "ufc fight", "wrestling match", "fencing competition",
    "olympics", "world cup", "championship game", "tournament final",
    " vs ", "team sport", "player stats",
    "fc", "afc", "united fc", "arsenal fc", "chelsea fc",
    "liverpool fc", "manchester united", "real madrid", "barcelona fc",
    "nba game", "nfl game", "mlb game", "nhl game", "fifa world cup", "uefa",
    "f1 drivers", "poker championship", "heads-up poker", "world series",
    // film and tv
    "movie release", "film premiere", "cinema screening", "hollywood movie", "oscar award",
    "emmy award", "grammy award", "golden globe", "award ceremony", "awards show",
    "movie actor", "movie actress", "film director", "movie producer", "movie studio",
    "netflix series", "disney movie", "marvel movie", "dc movie", "superhero movie",
    "avatar movie", "star wars movie", "harry potter movie", "batman movie", "superman movie",
    "opening weekend", "box office", "movie grossing", "movie sequel",
    // celebrity and culture
    "celebrity gossip", "famous person", "social media influencer", "instagram post",
    "twitter post", "tiktok video", "youtube video", "music streaming",
    "music song", "music album", "music concert", "music tour", "music band",
    "taylor swift concert", "beyonce concert", "kanye concert", "drake concert", "bts concert",
    // consumer tech
    "artificial intelligence", "chatgpt", "openai", "ai chatbot",
    "tesla car", "spacex rocket", "elon musk tweet", "meta platform", "facebook post",
    "google search", "apple iphone", "microsoft office", "amazon delivery", "netflix show",
    "video game", "esports tournament", "twitch stream", "gaming stream",
    // non-US elections and token sales
    "netherlands", "dutch", "romania", "bucharest", "argentina", "deputies election",
    "chile", "chilean", "megaeth", "mega eth", "public sale", "total commitments",
];

const US_SPECIFIC: &[&str] = &[
    "trump", "donald trump", "presidential nominee", "presidential election winner",
    "presidential election", "us presidential", "us election", "american presidential",
    "white house", "us congress", "us senate", "us house", "republican presidential",
    "democratic presidential", "us republican", "us democrat",
    "government shutdown", "debt ceiling", " us ", " usa ", "united states",
    "nyc", "new york city", "us recession",
    "us x ", "us-", "president of the united states", "us forces", "us military",
    "us economy", "us inflation", "us unemployment",
];

const FED: &[&str] = &[
    "fed", "federal reserve", "fomc", "powell", "jerome powell",
    "fed chair", "fed governor", "monetary policy",
    "rate cut", "rate increase", "interest rate",
    "fed decision", "fomc meeting", "fed meeting",
];

impl Default for KeywordRules {
    fn default() -> Self {
        let mut big_event = owned(US_POLITICS);
        big_event.extend(owned(WAR));
        big_event.extend(owned(CRISIS));

        Self {
            financial: owned(FINANCIAL),
            crypto: owned(CRYPTO),
            big_event,
            exclude: owned(EXCLUDE),
            us: owned(US_SPECIFIC),
            fed: owned(FED),
            war: owned(WAR),
        }
    }
}

impl KeywordRules {
    /// A rule set with every list empty; nothing matches.
    pub fn empty() -> Self {
        Self {
            financial: Vec::new(),
            crypto: Vec::new(),
            big_event: Vec::new(),
            exclude: Vec::new(),
            us: Vec::new(),
            fed: Vec::new(),
            war: Vec::new(),
        }
    }
}

pub(crate) fn matches_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| text.contains(k.as_str()))
}
