// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! FLORES-200 language code handling.
//!
//! Language identifiers in the translation API follow the `{lang}_{script}`
//! convention used by the FLORES-200 evaluation benchmark (e.g. `eng_Latn`,
//! `spa_Latn`, `zho_Hans`). These same strings double as decoder vocabulary
//! tag tokens, so validation here gates what the tokenizer and dispatcher
//! will ever see.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The 200 codes recognized by the FLORES-200 benchmark, in the canonical
/// `{lang}_{script}` form. This is the closed set `Language::parse` checks
/// against.
pub const FLORES_200_CODES: &[&str] = &[
    "ace_Arab", "ace_Latn", "acm_Arab", "acq_Arab", "aeb_Arab", "afr_Latn",
    "ajp_Arab", "aka_Latn", "amh_Ethi", "apc_Arab", "arb_Arab", "ars_Arab",
    "ary_Arab", "arz_Arab", "asm_Beng", "ast_Latn", "awa_Deva", "ayr_Latn",
    "azb_Arab", "azj_Latn", "bak_Cyrl", "bam_Latn", "ban_Latn", "bel_Cyrl",
    "bem_Latn", "ben_Beng", "bho_Deva", "bjn_Arab", "bjn_Latn", "bod_Tibt",
    "bos_Latn", "bug_Latn", "bul_Cyrl", "cat_Latn", "ceb_Latn", "ces_Latn",
    "cjk_Latn", "ckb_Arab", "crh_Latn", "cym_Latn", "dan_Latn", "deu_Latn",
    "dik_Latn", "dyu_Latn", "dzo_Tibt", "ell_Grek", "eng_Latn", "epo_Latn",
    "est_Latn", "eus_Latn", "ewe_Latn", "fao_Latn", "pes_Arab", "fij_Latn",
    "fin_Latn", "fon_Latn", "fra_Latn", "fur_Latn", "fuv_Latn", "gla_Latn",
    "gle_Latn", "glg_Latn", "grn_Latn", "guj_Gujr", "hat_Latn", "hau_Latn",
    "heb_Hebr", "hin_Deva", "hne_Deva", "hrv_Latn", "hun_Latn", "hye_Armn",
    "ibo_Latn", "ilo_Latn", "ind_Latn", "isl_Latn", "ita_Latn", "jav_Latn",
    "jpn_Jpan", "kab_Latn", "kac_Latn", "kam_Latn", "kan_Knda", "kas_Arab",
    "kas_Deva", "kat_Geor", "knc_Arab", "knc_Latn", "kaz_Cyrl", "kbp_Latn",
    "kea_Latn", "khm_Khmr", "kik_Latn", "kin_Latn", "kir_Cyrl", "kmb_Latn",
    "kon_Latn", "kor_Hang", "kmr_Latn", "lao_Laoo", "lvs_Latn", "lij_Latn",
    "lim_Latn", "lin_Latn", "lit_Latn", "lmo_Latn", "ltg_Latn", "ltz_Latn",
    "lua_Latn", "lug_Latn", "luo_Latn", "lus_Latn", "mag_Deva", "mai_Deva",
    "mal_Mlym", "mar_Deva", "min_Latn", "mkd_Cyrl", "plt_Latn", "mlt_Latn",
    "mni_Beng", "khk_Cyrl", "mos_Latn", "mri_Latn", "zsm_Latn", "mya_Mymr",
    "nld_Latn", "nno_Latn", "nob_Latn", "npi_Deva", "nso_Latn", "nus_Latn",
    "nya_Latn", "oci_Latn", "gaz_Latn", "ory_Orya", "pag_Latn", "pan_Guru",
    "pap_Latn", "pol_Latn", "por_Latn", "prs_Arab", "pbt_Arab", "quy_Latn",
    "ron_Latn", "run_Latn", "rus_Cyrl", "sag_Latn", "san_Deva", "sat_Olck",
    "scn_Latn", "shn_Mymr", "sin_Sinh", "slk_Latn", "slv_Latn", "smo_Latn",
    "sna_Latn", "snd_Arab", "som_Latn", "sot_Latn", "spa_Latn", "als_Latn",
    "srd_Latn", "srp_Cyrl", "ssw_Latn", "sun_Latn", "swe_Latn", "swh_Latn",
    "szl_Latn", "tam_Taml", "tat_Cyrl", "tel_Telu", "tgk_Cyrl", "tgl_Latn",
    "tha_Thai", "tir_Ethi", "taq_Latn", "taq_Tfng", "tpi_Latn", "tsn_Latn",
    "tso_Latn", "tuk_Latn", "tum_Latn", "tur_Latn", "twi_Latn", "tzm_Tfng",
    "uig_Arab", "ukr_Cyrl", "umb_Latn", "urd_Arab", "uzn_Latn", "vec_Latn",
    "vie_Latn", "war_Latn", "wol_Latn", "xho_Latn", "ydd_Hebr", "yor_Latn",
    "yue_Hant", "zho_Hans", "zho_Hant", "zul_Latn",
];

/// A validated FLORES-200 language code.
///
/// Constructed only through [`Language::parse`], which checks membership in
/// [`FLORES_200_CODES`]. Once constructed, the inner string is guaranteed to
/// be a valid decoder tag token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    /// Parses and validates a FLORES-200 code, returning
    /// [`Error::InvalidInput`] if it is not in the recognized set.
    pub fn parse(code: &str) -> Result<Self, Error> {
        if FLORES_200_CODES.contains(&code) {
            Ok(Self(code.to_string()))
        } else {
            Err(Error::InvalidInput(format!(
                "unrecognized FLORES-200 language code: {code}"
            )))
        }
    }

    /// Returns the code as a `&str`, e.g. `"eng_Latn"`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The decoder vocabulary tag token for this language, e.g. `"__eng_Latn__"`.
    #[must_use]
    pub fn tag_token(&self) -> String {
        format!("__{}__", self.0)
    }

    /// Default source language when none is supplied: English.
    #[must_use]
    pub fn default_source() -> Self {
        Self("eng_Latn".to_string())
    }

    /// Default target language when none is supplied: Spanish.
    #[must_use]
    pub fn default_target() -> Self {
        Self("spa_Latn".to_string())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_code() {
        let lang = Language::parse("eng_Latn").unwrap();
        assert_eq!(lang.as_str(), "eng_Latn");
    }

    #[test]
    fn test_parse_rejects_unknown_code() {
        let err = Language::parse("xxx_Zzzz").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_parse_rejects_lookalike_case() {
        // FLORES-200 codes are case-sensitive.
        assert!(Language::parse("ENG_LATN").is_err());
        assert!(Language::parse("eng_latn").is_err());
    }

    #[test]
    fn test_tag_token_format() {
        let lang = Language::parse("zho_Hans").unwrap();
        assert_eq!(lang.tag_token(), "__zho_Hans__");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Language::default_source().as_str(), "eng_Latn");
        assert_eq!(Language::default_target().as_str(), "spa_Latn");
    }

    #[test]
    fn test_display() {
        let lang = Language::parse("fra_Latn").unwrap();
        assert_eq!(lang.to_string(), "fra_Latn");
    }

    #[test]
    fn test_deserialize_from_json_string() {
        let lang: Language = serde_json::from_str("\"kor_Hang\"").unwrap();
        assert_eq!(lang.as_str(), "kor_Hang");
    }

    #[test]
    fn test_deserialize_rejects_invalid() {
        let result: Result<Language, _> = serde_json::from_str("\"not_a_code\"");
        assert!(result.is_err());
    }
}
