// src/manifest.rs

//! Build manifest generation.
//!
//! The manifest is the recipe handed to the build engine: it pulls pinned
//! formatter images, copies the input namespace in, and dispatches every
//! file to a tool by name pattern. Dispatch is an ordered table rendered
//! top-to-bottom into a shell `case`, so bare names like `BUILD` keep
//! precedence over suffix patterns, with a wildcard fallback closing the
//! statement. Unchanged outputs are deleted in the recipe itself, which
//! is what keeps already-formatted files out of the output archive.

/// Fixed archive entry name for the manifest
pub const MANIFEST_NAME: &str = "Dockerfile";

/// One dispatch rule: the first rule whose pattern matches wins
struct Rule {
    /// Shell `case` patterns, e.g. `*.json`
    patterns: &'static [&'static str],
    /// Command producing `../b/"$f"` from `"$f"`
    command: &'static str,
    /// Comment naming the covered languages
    label: &'static str,
}

/// Ordered dispatch table. Ordering is significant: `BUILD` and
/// `WORKSPACE` are bare names that must be matched before any wildcard.
const RULES: &[Rule] = &[
    Rule {
        label: "C / C++ / Protocol Buffers / Objective-C / Objective-C++",
        patterns: &["*.c", "*.cc", "*.cpp", "*.h", "*.hh", "*.proto", "*.m", "*.mm"],
        command: r#"clang-format -style=google -sort-includes "$f" >../b/"$f""#,
    },
    Rule {
        label: "Bazel / Skylark / Starlark",
        patterns: &["BUILD", "*.BUILD", "*.bzl", "*.sky", "*.star", "WORKSPACE"],
        command: r#"cp "$f" ../b/"$f" && buildifier -lint=fix ../b/"$f""#,
    },
    Rule {
        label: "JSON",
        patterns: &["*.json"],
        command: r#"cat "$f" | jq -S --tab . >../b/"$f""#,
    },
    Rule {
        label: "Python",
        patterns: &["*.py"],
        command: r#"yapf --style=google "$f" >../b/"$f""#,
    },
    Rule {
        label: "Shell",
        patterns: &["*.sh"],
        command: r#"shfmt -s -p -kp "$f" >../b/"$f""#,
    },
    Rule {
        label: "SQL",
        patterns: &["*.sql"],
        command: r#"sqlformat --keywords=upper --reindent --reindent_aligned --use_space_around_operators --comma_first True "$f" >../b/"$f""#,
    },
    Rule {
        label: "Go",
        patterns: &["*.go"],
        command: r#"gofmt -s "$f" >../b/"$f""#,
    },
];

/// Render the build manifest.
///
/// `complain` controls the wildcard fallback: when the caller named every
/// file explicitly, files no rule handles are reported on the diagnostic
/// side-channel as `! <file>`. A directory scan is expected to contain
/// non-formattable files, so traversal runs stay silent about them.
pub fn render(complain: bool) -> Vec<u8> {
    let fallback = if complain {
        r#"echo "! $f" >>../stdout"#
    } else {
        ""
    };

    let mut arms = String::new();
    for rule in RULES {
        arms.push_str(&format!(
            "      # {}\n        {}) {} ;; \\\n",
            rule.label,
            rule.patterns.join("|"),
            rule.command,
        ));
    }

    format!(
        r#"# syntax=docker.io/docker/dockerfile:1@sha256:42399d4635eddd7a9b8a24be879d2f9a930d0ed040a61324cfdf59ef1357b3b2

ARG BUILDIFIER_IMAGE=docker.io/whilp/buildifier@sha256:67da91fdddd40e9947153bc9157ab9103c141fcabcdbf646f040ba7a763bc531
ARG CLANGFORMAT_IMAGE=docker.io/unibeautify/clang-format@sha256:1b2d3997012ae221c600668802f1b761973d9006d330effa9555516432dea9c1
ARG GOFMT_IMAGE=docker.io/library/golang:1@sha256:4918412049183afe42f1ecaf8f5c2a88917c2eab153ce5ecf4bf2d55c1507b74
ARG SHFMT_IMAGE=docker.io/mvdan/shfmt@sha256:f0d8d9f0c9dc15eb4e76b06035e7ffc59018d08e300e0af096be481a37a7d1dc

FROM --platform=$BUILDPLATFORM $BUILDIFIER_IMAGE AS buildifier
FROM --platform=$BUILDPLATFORM $CLANGFORMAT_IMAGE AS clang-format
FROM --platform=$BUILDPLATFORM $GOFMT_IMAGE AS golang
FROM --platform=$BUILDPLATFORM $SHFMT_IMAGE AS shfmt
FROM --platform=$BUILDPLATFORM docker.io/library/alpine@sha256:21a3deaa0d32a8057914f36584b5288d2e5ecc984380bc0118285c70fa8c9300 AS alpine

FROM alpine AS tool
WORKDIR /app/b
WORKDIR /app/a
ARG YAPF_VERSION=0.31.0
ARG SQLFORMAT_VERSION=0.4.2
RUN \
  --mount=type=cache,target=/var/cache/apk ln -vs /var/cache/apk /etc/apk/cache && \
    set -ux \
 && apk add --no-cache py3-pip clang jq \
 && touch /app/stdout \
 && pip3 install \
      yapf=="$YAPF_VERSION" \
      sqlparse=="$SQLFORMAT_VERSION"
COPY --from=buildifier /buildifier /usr/bin/buildifier
COPY --from=clang-format /usr/bin/clang-format /usr/bin/clang-format
COPY --from=golang /usr/local/go/bin/gofmt /usr/bin/gofmt
COPY --from=shfmt /bin/shfmt /usr/bin/shfmt

FROM tool AS product
COPY a /app/a/
RUN \
    set -ux \
 && while read -r f; do \
      f=${{f#./*}} \
      && \
      mkdir -p ../b/"$(dirname "$f")" \
      && \
      case "$f" in \
{arms}        *) {fallback} ;; \
      esac \
      && \
      if [ -f ../b/"$f" ] && diff -q "$f" ../b/"$f" >/dev/null; then rm ../b/"$f"; fi \
      ; \
   done < <(find . -type f)

FROM scratch
COPY --from=product /app/b/ /
COPY --from=product /app/stdout /
"#
    )
    .into_bytes()
}
