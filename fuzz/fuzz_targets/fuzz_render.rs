// SPDX-License-Identifier: AGPL-3.0-or-later
#![no_main]

use libfuzzer_sys::fuzz_target;
use mobiledoc_core::{
    Atom, Card, Document, ExtensionResult, Marker, Markup, Payload, Renderer, Section, TextRenderer,
};
use std::io::{self, Write};

/// Build a document from raw bytes; indices may point past the tables
fn document_from_bytes(data: &[u8]) -> Document {
    let mut doc = Document::new();
    doc.add_markup(Markup::new("b"));
    doc.add_atom(Atom::new("echo", "@atom"));
    doc.add_atom(Atom::new("unregistered", "@raw"));
    doc.add_card(Card::new("ok"));
    doc.add_card(Card::new("missing"));

    let mut markers = Vec::new();
    for chunk in data.chunks(3) {
        let (kind, arg, closed) = match *chunk {
            [a, b, c] => (a, b, c),
            _ => break,
        };
        match kind % 6 {
            0 => markers.push(
                Marker::text(String::from_utf8_lossy(&[arg]).into_owned())
                    .with_open([usize::from(closed % 3)])
                    .with_closed(usize::from(closed % 4)),
            ),
            1 => markers.push(Marker::atom(usize::from(arg % 4))),
            2 => doc.push_section(Section::paragraph(std::mem::take(&mut markers))),
            3 => doc.push_section(Section::list("ul", vec![std::mem::take(&mut markers)])),
            4 => doc.push_section(Section::card(usize::from(arg % 3))),
            _ => doc.push_section(Section::image(String::from_utf8_lossy(chunk).into_owned())),
        }
    }
    doc.push_section(Section::paragraph(markers));
    doc
}

fuzz_target!(|data: &[u8]| {
    let doc = document_from_bytes(data);

    let mut renderer = TextRenderer::new();
    renderer.register_atom("echo", |w: &mut dyn Write, text: &str, _: &Payload| -> ExtensionResult {
        w.write_all(text.as_bytes())?;
        Ok(())
    });
    renderer.register_card("ok", |w: &mut dyn Write, _: &Payload| -> ExtensionResult {
        w.write_all(b"[card]")?;
        Ok(())
    });

    // Errors are expected for malformed input; panics are not.
    let _ = renderer.render(&mut io::sink(), &doc);
});
