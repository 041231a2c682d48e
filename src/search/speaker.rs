//! Search by speaker name / 按说话者搜索
//!
//! Three disjoint sub-queries, in order:
//! 1. NPC dialogue, matched on the NPC's display name
//! 2. Player / counterpart dialogue, matched on their localized names in memory
//! 3. Character voice lines (fetters), only when a content keyword is present
//!
//! Every sub-query groups by text hash and excludes the hashes of the earlier ones,
//! so counts add up to the number of distinct results and pages never repeat a hash.

use sqlx::{QueryBuilder, Sqlite};

use crate::error::Result;
use crate::models::{LangCode, TalkerRole, VoiceFilter};
use crate::search::corpus::{push_exact_rank, push_match, push_voice_filter};
use crate::search::pattern::{name_expr, LikePatterns};
use crate::store::lookup::WANDERER_PLACEHOLDER;
use crate::store::TextStore;

/// Speaker sub-query / 说话者子查询
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerSubQuery {
    Npc,
    Pseudo,
    Fetter,
}

impl SpeakerSubQuery {
    pub fn name(self) -> &'static str {
        match self {
            SpeakerSubQuery::Npc => "speaker:npc",
            SpeakerSubQuery::Pseudo => "speaker:pseudo",
            SpeakerSubQuery::Fetter => "speaker:fetter",
        }
    }

    fn key_column(self) -> &'static str {
        match self {
            SpeakerSubQuery::Npc => "d.textHash",
            SpeakerSubQuery::Pseudo => "p.textHash",
            SpeakerSubQuery::Fetter => "f.voiceFileTextTextMapHash",
        }
    }

    fn earlier(self) -> &'static [SpeakerSubQuery] {
        match self {
            SpeakerSubQuery::Npc => &[],
            SpeakerSubQuery::Pseudo => &[SpeakerSubQuery::Npc],
            SpeakerSubQuery::Fetter => &[SpeakerSubQuery::Npc, SpeakerSubQuery::Pseudo],
        }
    }
}

/// One speaker hit / 说话者命中
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SpeakerHit {
    #[sqlx(rename = "textHash")]
    pub text_hash: i64,
    pub talker: Option<String>,
}

/// Prepared speaker search / 说话者搜索
pub struct SpeakerSearch<'a> {
    store: &'a TextStore,
    lang: LangCode,
    speaker: LikePatterns,
    content: Option<LikePatterns>,
    filter: VoiceFilter,
    pseudo_roles: Vec<TalkerRole>,
    wanderer: Option<String>,
}

impl<'a> SpeakerSearch<'a> {
    /// Resolve pseudo speakers and the wanderer's name for `lang` / 预先解析伪说话者
    pub async fn prepare(
        store: &'a TextStore,
        lang: LangCode,
        speaker: &str,
        content: Option<&str>,
        filter: VoiceFilter,
    ) -> Result<Self> {
        let speaker = LikePatterns::build(speaker, lang);

        let mut pseudo_roles = Vec::new();
        for role in TalkerRole::PSEUDO {
            let names = store.pseudo_speaker_names(&role, lang).await?;
            if names.iter().any(|name| speaker.matches(&strip_name(name, lang))) {
                pseudo_roles.push(role);
            }
        }

        let wanderer = store
            .wanderer_name(lang)
            .await?
            .filter(|name| speaker.matches(&strip_name(name, lang)));

        Ok(Self {
            store,
            lang,
            speaker,
            content: content.map(|kw| LikePatterns::build(kw, lang)),
            filter,
            pseudo_roles,
            wanderer,
        })
    }

    /// Sub-queries that take part, in order / 参与的子查询
    pub fn sub_queries(&self) -> Vec<SpeakerSubQuery> {
        let mut subs = vec![SpeakerSubQuery::Npc, SpeakerSubQuery::Pseudo];
        if self.content.is_some() {
            subs.push(SpeakerSubQuery::Fetter);
        }
        subs
    }

    fn is_empty(&self, sub: SpeakerSubQuery) -> bool {
        match sub {
            SpeakerSubQuery::Pseudo => self.pseudo_roles.is_empty(),
            SpeakerSubQuery::Fetter => self.content.is_none(),
            SpeakerSubQuery::Npc => false,
        }
    }

    /// `FROM ... WHERE ...` of one sub-query, without exclusions / 子查询的基础条件
    fn push_membership(&self, qb: &mut QueryBuilder<'_, Sqlite>, sub: SpeakerSubQuery) {
        match sub {
            SpeakerSubQuery::Npc => {
                qb.push(" FROM dialogue d JOIN npc n ON n.npcId = d.talkerId")
                    .push(" JOIN textMap nm ON nm.hash = n.textHash AND nm.lang = ")
                    .push_bind(self.lang.0);
                if self.content.is_some() {
                    qb.push(" JOIN textMap t ON t.hash = d.textHash AND t.lang = ").push_bind(self.lang.0);
                }
                qb.push(" WHERE d.talkerType = ").push_bind(TalkerRole::Npc.as_db().to_string());
                let name = name_expr("nm.content", self.lang);
                qb.push(" AND ((")
                    .push(&name)
                    .push(" LIKE ")
                    .push_bind(self.speaker.exact.clone())
                    .push(" ESCAPE '\\' OR ")
                    .push(&name)
                    .push(" LIKE ")
                    .push_bind(self.speaker.fuzzy.clone())
                    .push(" ESCAPE '\\')");
                if self.wanderer.is_some() {
                    qb.push(" OR nm.content = ").push_bind(WANDERER_PLACEHOLDER);
                }
                qb.push(")");
                if let Some(content) = &self.content {
                    push_match(qb, "t.content", content);
                }
            }
            SpeakerSubQuery::Pseudo => {
                qb.push(" FROM dialogue p");
                if self.content.is_some() {
                    qb.push(" JOIN textMap pt ON pt.hash = p.textHash AND pt.lang = ").push_bind(self.lang.0);
                }
                qb.push(" WHERE p.talkerType IN (");
                let mut roles = qb.separated(", ");
                for role in &self.pseudo_roles {
                    roles.push_bind(role.as_db().to_string());
                }
                roles.push_unseparated(")");
                if let Some(content) = &self.content {
                    push_match(qb, "pt.content", content);
                }
            }
            SpeakerSubQuery::Fetter => {
                qb.push(" FROM fetters f JOIN avatar a ON a.avatarId = f.avatarId")
                    .push(" JOIN textMap an ON an.hash = a.nameTextMapHash AND an.lang = ")
                    .push_bind(self.lang.0)
                    .push(" JOIN textMap ft ON ft.hash = f.voiceFileTextTextMapHash AND ft.lang = ")
                    .push_bind(self.lang.0)
                    .push(" WHERE 1 = 1");
                push_match(qb, &name_expr("an.content", self.lang), &self.speaker);
                if let Some(content) = &self.content {
                    push_match(qb, "ft.content", content);
                }
            }
        }
        push_voice_filter(qb, sub.key_column(), self.filter);
    }

    /// Membership plus exclusion of earlier sub-queries / 追加对前序子查询的排除
    fn push_from_where(&self, qb: &mut QueryBuilder<'_, Sqlite>, sub: SpeakerSubQuery) {
        self.push_membership(qb, sub);
        for &earlier in sub.earlier() {
            if self.is_empty(earlier) {
                continue;
            }
            qb.push(" AND ")
                .push(sub.key_column())
                .push(" NOT IN (SELECT ")
                .push(earlier.key_column());
            self.push_membership(qb, earlier);
            qb.push(")");
        }
        qb.push(" GROUP BY ").push(sub.key_column());
    }

    pub async fn count(&self, sub: SpeakerSubQuery) -> Result<u64> {
        if self.is_empty(sub) {
            return Ok(0);
        }
        let mut qb = QueryBuilder::new("SELECT count(*) FROM (SELECT ");
        qb.push(sub.key_column());
        self.push_from_where(&mut qb, sub);
        qb.push(")");

        let count: i64 = qb.build_query_scalar().fetch_one(self.store.pool()).await?;
        Ok(count.max(0) as u64)
    }

    pub async fn fetch(&self, sub: SpeakerSubQuery, limit: u64, offset: u64) -> Result<Vec<SpeakerHit>> {
        if self.is_empty(sub) {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(sub.key_column()).push(" AS textHash, ");
        match sub {
            SpeakerSubQuery::Npc => qb.push("min(nm.content) AS talker"),
            SpeakerSubQuery::Pseudo => qb.push("min(p.talkerType) AS talker"),
            SpeakerSubQuery::Fetter => qb.push("min(an.content) AS talker"),
        };
        self.push_from_where(&mut qb, sub);

        qb.push(" ORDER BY ");
        let first_id = match sub {
            SpeakerSubQuery::Npc => "min(d.dialogueId)",
            SpeakerSubQuery::Pseudo => "min(p.dialogueId)",
            SpeakerSubQuery::Fetter => "min(f.fetterId)",
        };
        match (&self.content, sub) {
            (Some(content), _) => {
                let column = match sub {
                    SpeakerSubQuery::Npc => "t.content",
                    SpeakerSubQuery::Pseudo => "pt.content",
                    SpeakerSubQuery::Fetter => "ft.content",
                };
                qb.push("min(");
                push_exact_rank(&mut qb, column, content);
                qb.push("), min(length(").push(column).push(")), ");
            }
            (None, SpeakerSubQuery::Npc) => {
                let name = name_expr("nm.content", self.lang);
                qb.push("min(");
                push_exact_rank(&mut qb, &name, &self.speaker);
                qb.push("), min(length(nm.content)), ");
            }
            (None, _) => {}
        }
        qb.push(first_id).push(", textHash");
        qb.push(" LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(offset).unwrap_or(i64::MAX));

        let mut hits: Vec<SpeakerHit> = qb.build_query_as().fetch_all(self.store.pool()).await?;
        for hit in &mut hits {
            hit.talker = self.display_talker(sub, hit.talker.take());
        }
        Ok(hits)
    }

    fn display_talker(&self, sub: SpeakerSubQuery, raw: Option<String>) -> Option<String> {
        match sub {
            SpeakerSubQuery::Pseudo => {
                TalkerRole::from_db(raw.as_deref()).fixed_label().map(str::to_string)
            }
            SpeakerSubQuery::Npc if raw.as_deref() == Some(WANDERER_PLACEHOLDER) => self.wanderer.clone(),
            _ => raw,
        }
    }
}

fn strip_name(name: &str, lang: LangCode) -> String {
    if lang.is_logographic() {
        name.chars().filter(|c| *c != ' ' && *c != '\u{3000}').collect()
    } else {
        name.to_string()
    }
}
