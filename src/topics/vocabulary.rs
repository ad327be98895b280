// Topic vocabulary — fertility / IVF / surrogacy terminology.
//
// Patterns are matched against text that has already been lower-cased and
// whitespace-collapsed (see `classifier::prepare`), so every pattern here is
// written in lower case with single spaces. Latin and Cyrillic entries get
// letter boundaries added at compile time; Chinese entries match anywhere.

/// How a pattern is anchored against surrounding letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Letter boundary on both sides ("эко" but not "экология").
    Word,
    /// Letter boundary before only, so the pattern acts as a stem
    /// ("embryo" matches "embryos", "embryonic").
    Prefix,
    /// No boundary (scripts without word separators).
    Anywhere,
}

#[derive(Debug, Clone, Copy)]
pub struct Term {
    pub lang: &'static str,
    pub pattern: &'static str,
    pub anchor: Anchor,
}

const fn word(lang: &'static str, pattern: &'static str) -> Term {
    Term { lang, pattern, anchor: Anchor::Word }
}

const fn stem(lang: &'static str, pattern: &'static str) -> Term {
    Term { lang, pattern, anchor: Anchor::Prefix }
}

const fn anywhere(lang: &'static str, pattern: &'static str) -> Term {
    Term { lang, pattern, anchor: Anchor::Anywhere }
}

/// Characters treated as part of a word when checking boundaries:
/// ASCII alphanumerics, Latin-1 letters, and Cyrillic.
pub const LETTER_CLASS: &str = "0-9a-z_ß-öø-ÿа-яё";

/// Positive vocabulary. A match on any entry makes a text relevant.
pub const TOPIC_TERMS: &[Term] = &[
    // English
    word("en", "ivf"),
    word("en", "in[ -]?vitro"),
    word("en", "(?:in)?fertil(?:e|ity)"),
    word("en", "fertili[sz]ation"),
    stem("en", "embryo"),
    stem("en", "blastocyst"),
    stem("en", "oocyte"),
    stem("en", "surroga(?:cy|te)"),
    word("en", "egg (?:donation|donors?|freezing|retrieval)"),
    word("en", "sperm (?:donation|donors?|banks?)"),
    stem("en", "assisted reproduct"),
    stem("en", "reproductive (?:medicine|health|technolog|endocrinolog)"),
    word("en", "icsi"),
    word("en", "pgt(?:-a|-m|-sr)?"),
    // Russian
    word("ru", "эко"),
    stem("ru", "экстракорпоральн"),
    stem("ru", "искусственн(?:ое|ого|ым) оплодотворени"),
    stem("ru", "фертильн"),
    stem("ru", "бесплоди"),
    stem("ru", "эмбрион"),
    stem("ru", "суррогатн"),
    stem("ru", "репродукт"),
    stem("ru", "криоконсерваци"),
    stem("ru", "донорств(?:о|а) (?:спермы|яйцеклет|ооцит)"),
    stem("ru", "зачати"),
    word("ru", "плод"),
    word("ru", "икси"),
    word("ru", "пгт"),
    // Russian transliteration
    word("ru-latn", "eko"),
    stem("ru-latn", "besplodi"),
    stem("ru-latn", "surrogatn"),
    stem("ru-latn", "reproduktivn"),
    // Spanish
    word("es", "fiv"),
    stem("es", "fecundaci[oó]n in vitro"),
    stem("es", "reproducci[oó]n asistida"),
    stem("es", "(?:in)?fertilidad"),
    stem("es", "embri[oó]n"),
    stem("es", "gestaci[oó]n subrogada"),
    stem("es", "vientres? de alquiler"),
    stem("es", "ovodonaci[oó]n"),
    // French
    stem("fr", "f[ée]condation in vitro"),
    stem("fr", "procr[ée]ation m[ée]dicalement assist[ée]e"),
    word("fr", "pma"),
    stem("fr", "(?:in)?fertilit[ée]"),
    stem("fr", "embryon"),
    stem("fr", "gestation pour autrui"),
    word("fr", "gpa"),
    // German
    stem("de", "k[üu]nstliche befruchtung"),
    stem("de", "(?:un)?fruchtbarkeit"),
    stem("de", "kinderwunsch"),
    stem("de", "leihmutter"),
    stem("de", "reproduktionsmedizin"),
    stem("de", "eizellspende"),
    // Italian
    stem("it", "fecondazione (?:in vitro|assistita|eterologa)"),
    stem("it", "procreazione (?:medicalmente )?assistita"),
    stem("it", "(?:in)?fertilit[àa]"),
    stem("it", "embrion[ei]"),
    stem("it", "maternit[àa] surrogata"),
    stem("it", "utero in affitto"),
    // Chinese
    anywhere("zh", "试管婴儿"),
    anywhere("zh", "体外受精"),
    anywhere("zh", "辅助生殖"),
    anywhere("zh", "不孕"),
    anywhere("zh", "不育"),
    anywhere("zh", "生育力"),
    anywhere("zh", "胚胎"),
    anywhere("zh", "代孕"),
    anywhere("zh", "冻卵"),
    anywhere("zh", "人工授精"),
    // Chinese transliteration (pinyin)
    word("zh-latn", "shiguan ?ying ?er"),
    word("zh-latn", "dai ?yun"),
];

/// The ambiguous acronym. On its own it mostly means "art" the noun.
pub const ART_ACRONYM: Term = word("en", "art");

/// Terms that must appear alongside the acronym for it to count.
pub const ART_CONTEXT_TERMS: &[Term] = &[
    stem("en", "reproduct"),
    stem("en", "(?:in)?fertil"),
    word("en", "ivf"),
    word("es", "fiv"),
    stem("en", "embryo"),
    stem("ru", "репродукт"),
    stem("ru", "вспомогательн"),
    stem("es", "reproducci[oó]n"),
    stem("fr", "procr[ée]ation"),
    stem("it", "riproduzion"),
    stem("de", "fortpflanzung"),
];

/// High-traffic politics / finance terms that veto a match.
pub const STOP_TERMS: &[Term] = &[
    stem("ru", "экономик"),
    stem("ru", "путин"),
    stem("ru", "ставк"),
    stem("ru", "банк"),
    stem("ru", "минэкономразвития"),
    stem("ru", "совфед"),
    word("ru", "цб рф"),
    stem("en", "putin"),
    stem("en", "kremlin"),
    word("en", "central banks?"),
    word("en", "interest rates?"),
    word("en", "stock markets?"),
];

/// English medical terms and the bold Russian replacement used before
/// rewriting. The Russian side also serves as classifier keywords.
pub const MEDICAL_GLOSSARY: &[(&str, &str)] = &[
    ("ivf", "ЭКО"),
    ("in vitro fertilization", "экстракорпоральное оплодотворение"),
    ("embryo", "эмбрион"),
    ("implantation", "имплантация"),
    ("fertility", "фертильность"),
    ("blastocyst", "бластоциста"),
    ("ovarian stimulation", "стимуляция яичников"),
    ("sperm", "сперматозоид"),
    ("oocyte", "ооцит"),
    ("zygote", "зигота"),
    ("gestation", "гестация"),
    ("PGT", "ПГТ (преимплантационное генетическое тестирование)"),
    ("ICSI", "ИКСИ (интрацитоплазматическая инъекция сперматозоида)"),
    ("ovulation induction", "индукция овуляции"),
    ("endometrium", "эндометрий"),
    ("follicle", "фолликул"),
    ("gamete", "гамета"),
    ("zygote intrafallopian transfer", "зиготный внутрифаллопиевый перенос"),
    ("surrogacy", "суррогатное материнство"),
];

/// Feeds polled when RSS_FEEDS is not set.
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://www.fertilitynetworkuk.org/feed/",
    "https://www.news-medical.net/tag/feed/ivf.aspx",
    "https://www.sciencedaily.com/rss/health_medicine/fertility.xml",
    "https://www.sciencedaily.com/rss/health_medicine/gynecology.xml",
    "https://www.sciencedaily.com/rss/health_medicine/pregnancy_and_childbirth.xml",
    "https://www.sciencedaily.com/rss/health_medicine/stem_cells.xml",
    "https://www.sciencedaily.com/rss/science_society/bioethics.xml",
    "https://www.medicalnewstoday.com/categories/fertility/rss",
    "https://www.eurekalert.org/news/rss/health.xml",
    "https://www.nature.com/subjects/embryology.rss",
    "https://www.technologyreview.com/feed/",
    "https://www.theguardian.com/science/rss",
    "https://www.lemonde.fr/sante/rss_full.xml",
    "https://www.lefigaro.fr/rss/figaro_sante.xml",
    "https://www.spiegel.de/gesundheit/index.rss",
    "https://www.faz.net/aktuell/gesundheit/rss.xml",
    "https://www.repubblica.it/salute/rss",
    "https://www.elmundo.es/rss/salud.xml",
    "https://elpais.com/salud-y-bienestar/rss/",
    "https://ccrmivf.com/feed",
    "https://doctoreko.ru/news/rss",
    "https://elementy.ru/rss/news",
    "https://news.google.com/rss/search?q=IVF%7CFertility%7CEmbryo%7CPGT%7CSurrogacy&hl=ru-RU&gl=US&ceid=US:ru",
];
