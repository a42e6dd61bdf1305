use crate::models::{AttendanceKind, MonthlyBucket, SaleRecord, SalesSummary};
use std::fmt::Write;

pub fn render_index(user: &str, next_kind: AttendanceKind, summary: &SalesSummary) -> String {
    fill(
        INDEX_HTML,
        &[
            ("USER", escape_html(user)),
            ("NEXT_KIND", next_kind.label().to_string()),
            ("NEXT_CLASS", kind_class(next_kind).to_string()),
            ("MONTH_TOTAL", format_brl(summary.current_month_total)),
            ("YEAR_TOTAL", format_brl(summary.year_total)),
            ("GOAL", format_brl(summary.goal)),
            ("PROGRESS", summary.goal_progress.to_string()),
            ("MONTHLY_ROWS", monthly_rows(&summary.monthly_series)),
            ("RECENT_ROWS", recent_rows(&summary.recent)),
        ],
    )
}

/// Replaces `{{NAME}}` placeholders in one pass, so substituted values are
/// never scanned for placeholders again. Unknown names are left untouched.
fn fill(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };
        let name = &after[..end];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn monthly_rows(series: &[MonthlyBucket]) -> String {
    if series.is_empty() {
        return r#"<tr><td colspan="2">Sem vendas registradas.</td></tr>"#.to_string();
    }
    let peak = series.iter().map(|bucket| bucket.total).fold(0.0, f64::max);
    let mut rows = String::new();
    for bucket in series {
        let width = if peak > 0.0 {
            (bucket.total / peak * 100.0).round()
        } else {
            0.0
        };
        let _ = write!(rows, "<tr><td>{}</td>", escape_html(&bucket.label));
        let _ = write!(
            rows,
            r#"<td><span class="bar" style="width:{width}%"></span>{}</td></tr>"#,
            format_brl(bucket.total),
        );
    }
    rows
}

fn recent_rows(recent: &[SaleRecord]) -> String {
    if recent.is_empty() {
        return r#"<tr><td colspan="3">Nenhuma venda recente.</td></tr>"#.to_string();
    }
    let mut rows = String::new();
    for sale in recent {
        let _ = write!(
            rows,
            "<tr><td>{date}</td><td>{description}</td><td>{amount}</td></tr>",
            date = sale.occurred_at.format("%d/%m/%Y"),
            description = escape_html(&sale.description),
            amount = format_brl(sale.amount),
        );
    }
    rows
}

fn kind_class(kind: AttendanceKind) -> &'static str {
    match kind {
        AttendanceKind::CheckIn => "check-in",
        AttendanceKind::CheckOut => "check-out",
    }
}

/// Formats as `R$ 15.000,00`.
fn format_brl(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let (whole, fraction) = (cents.abs() / 100, cents.abs() % 100);

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if cents < 0 { "-" } else { "" };
    format!("R$ {sign}{grouped},{fraction:02}")
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Portal do Colaborador</title>
  <style>
    :root {
      --ink: #1f2937;
      --accent: #4338ca;
      --in: #16a34a;
      --out: #dc2626;
      --card: #ffffff;
    }

    body {
      margin: 0;
      font-family: system-ui, sans-serif;
      background: #eef2ff;
      color: var(--ink);
      display: grid;
      place-items: center;
      padding: 24px;
    }

    .portal {
      width: min(900px, 100%);
      display: grid;
      gap: 20px;
    }

    nav button {
      border: 0;
      padding: 10px 18px;
      border-radius: 999px;
      background: var(--card);
      cursor: pointer;
    }

    nav button.active {
      background: var(--accent);
      color: #fff;
    }

    section {
      background: var(--card);
      border-radius: 18px;
      padding: 24px;
      box-shadow: 0 12px 30px rgba(67, 56, 202, 0.12);
    }

    section[hidden] {
      display: none;
    }

    .check-in { color: var(--in); }
    .check-out { color: var(--out); }

    video {
      width: 100%;
      max-width: 420px;
      border-radius: 12px;
      transform: scaleX(-1);
    }

    .kpis {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 12px;
    }

    .kpi {
      border-radius: 12px;
      padding: 14px;
      background: #f5f3ff;
    }

    .kpi strong {
      display: block;
      font-size: 1.4rem;
    }

    .bar {
      display: inline-block;
      height: 10px;
      margin-right: 8px;
      border-radius: 5px;
      background: var(--accent);
    }

    table {
      width: 100%;
      border-collapse: collapse;
    }

    td {
      padding: 6px 4px;
      border-bottom: 1px solid #e5e7eb;
    }

    .status {
      min-height: 1.2em;
      font-size: 0.9rem;
    }
  </style>
</head>
<body>
  <main class="portal" data-user="{{USER}}">
    <nav>
      <button class="active" data-tab="ponto">Registro de Ponto</button>
      <button data-tab="vendas">Dashboard de Vendas</button>
    </nav>

    <section id="ponto">
      <h2>Registro de Ponto</h2>
      <p>Próximo ponto: <strong id="next-kind" class="{{NEXT_CLASS}}">{{NEXT_KIND}}</strong></p>
      <video id="camera" autoplay playsinline muted></video>
      <canvas id="frame" hidden></canvas>
      <p><button id="register">Registrar {{NEXT_KIND}}</button></p>
      <p class="status" id="ponto-status"></p>
      <div id="history"></div>
    </section>

    <section id="vendas" hidden>
      <h2>Dashboard de Vendas</h2>
      <div class="kpis">
        <div class="kpi">Vendas no Mês<strong>{{MONTH_TOTAL}}</strong></div>
        <div class="kpi">Progresso da Meta<strong>{{PROGRESS}}%</strong></div>
        <div class="kpi">Meta Mensal<strong>{{GOAL}}</strong></div>
        <div class="kpi">Vendas no Ano<strong>{{YEAR_TOTAL}}</strong></div>
      </div>
      <h3>Vendas por Mês</h3>
      <table id="monthly">{{MONTHLY_ROWS}}</table>
      <h3>Vendas Recentes</h3>
      <table id="recent">{{RECENT_ROWS}}</table>
    </section>
  </main>

  <script>
    const portal = document.querySelector('.portal');
    const user = encodeURIComponent(portal.dataset.user);
    const video = document.getElementById('camera');
    const canvas = document.getElementById('frame');
    const statusEl = document.getElementById('ponto-status');
    const registerBtn = document.getElementById('register');
    let stream = null;

    document.querySelectorAll('nav button').forEach((button) => {
      button.addEventListener('click', () => {
        document.querySelectorAll('nav button').forEach((b) => b.classList.toggle('active', b === button));
        document.querySelectorAll('section').forEach((s) => { s.hidden = s.id !== button.dataset.tab; });
      });
    });

    async function startCamera() {
      try {
        stream = await navigator.mediaDevices.getUserMedia({ video: true });
        video.srcObject = stream;
      } catch (err) {
        statusEl.textContent = 'Câmera indisponível.';
      }
    }

    function stopCamera() {
      if (stream) {
        stream.getTracks().forEach((track) => track.stop());
        stream = null;
      }
    }

    function grabFrame() {
      if (!stream || !video.videoWidth) return null;
      canvas.width = video.videoWidth;
      canvas.height = video.videoHeight;
      const ctx = canvas.getContext('2d');
      ctx.save();
      ctx.scale(-1, 1);
      ctx.drawImage(video, -canvas.width, 0);
      ctx.restore();
      return canvas.toDataURL('image/png');
    }

    async function loadHistory() {
      const res = await fetch(`/api/users/${user}/attendance`);
      if (!res.ok) return;
      const data = await res.json();
      const label = data.next_kind === 'check_in' ? 'Entrada' : 'Saída';
      const next = document.getElementById('next-kind');
      next.textContent = label;
      next.className = data.next_kind === 'check_in' ? 'check-in' : 'check-out';
      registerBtn.textContent = `Registrar ${label}`;
      document.getElementById('history').innerHTML = data.days.map((day) => `
        <h4>${day.date}</h4>
        <ul>${day.records.map((r) => `<li class="${r.kind === 'check_in' ? 'check-in' : 'check-out'}">
          ${r.kind === 'check_in' ? 'Entrada' : 'Saída'} - ${new Date(r.occurred_at).toLocaleTimeString('pt-BR')}
        </li>`).join('')}</ul>`).join('');
    }

    registerBtn.addEventListener('click', async () => {
      registerBtn.disabled = true;
      try {
        const res = await fetch(`/api/users/${user}/attendance`, {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify({ image: grabFrame() })
        });
        if (res.ok) {
          const record = await res.json();
          statusEl.textContent = `Ponto registrado às ${new Date(record.occurred_at).toLocaleTimeString('pt-BR')}.`;
        } else {
          statusEl.textContent = await res.text();
        }
        await loadHistory();
      } finally {
        registerBtn.disabled = false;
      }
    });

    window.addEventListener('pagehide', stopCamera);
    startCamera();
    loadHistory();
  </script>
</body>
</html>
"#;
